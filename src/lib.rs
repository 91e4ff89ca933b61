//! Time-series datasource over a SQL-queryable columnar store.
//!
//! Structured query descriptions are compiled to SQL ([`query::compiler`]),
//! executed against DuckDB ([`db`]), and the tabular result is reshaped into
//! named series ([`transform`]). [`datasource::Datasource`] wires the three
//! together and [`web`] exposes them over HTTP.

pub mod config;
pub mod datasource;
pub mod db;
pub mod query;
pub mod transform;
pub mod util;
pub mod web;
