pub mod data;
pub mod emit;
pub mod error;
pub mod fetch;
pub mod flashpoint;
pub mod parse;
pub mod pipeline;
pub mod transform;

pub use data::{Dataset, Record, Value};
pub use error::{ConfigError, EmitError, FetchError, ParseError, PipelineError, TransformError};
pub use fetch::{Fetcher, HttpFetcher, StaticFetcher};
pub use pipeline::{PipelineConfig, RunSummary};
