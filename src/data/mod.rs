pub mod dataset;
pub mod value;

pub use dataset::{Dataset, Record, Row};
pub use value::Value;
