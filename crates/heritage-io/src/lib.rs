//! File I/O, wire formats and result serialization for the heritage pipeline.

mod error;
mod reader;
mod request;
mod writer;

pub use error::IoError;
pub use reader::RecordReader;
pub use request::{PredictionRequest, PredictionResponse, records_from_table};
pub use writer::{ResultWriter, best_strategy};
