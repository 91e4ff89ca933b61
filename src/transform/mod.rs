pub mod response;
pub mod table;

pub use response::transform;
pub use table::{Datapoint, RawTable, TimeSeries};
