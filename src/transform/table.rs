use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A store result: named columns and positionally aligned rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub cols: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    pub fn new(cols: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { cols, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.cols.iter().position(|col| col == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `[value, timestamp_ms]`, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint(pub Value, pub i64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub target: String,
    pub datapoints: Vec<Datapoint>,
}
