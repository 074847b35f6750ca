pub mod accumulation;
pub mod error;
pub mod metrics;
pub mod run_id;
pub mod summary;

pub use accumulation::{AccumulationFile, ACCUMULATION_COLUMNS};
pub use error::{AccumulationError, MetricLineError, RunIdError};
pub use metrics::{Metric, MetricRecord, Value};
pub use run_id::RunId;
pub use summary::{Outcome, RunSummary};
