//! CSV input, validation, and JSON result output for the canopy pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ExperimentName, LabelledTable};
pub use error::IoError;
pub use reader::LabelledCsvReader;
pub use writer::{EvaluationReport, ResultWriter, write_table};
