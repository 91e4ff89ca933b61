pub mod aggregation;
pub mod compiler;
pub mod error;
pub mod model;

pub use aggregation::{AggregationKind, MetricAgg};
pub use error::{QueryError, QueryResult};
pub use model::{OrderType, QueryDescription, QueryMode, TimeFormat, WhereClause, WhereValue};
