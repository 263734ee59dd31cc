//! Worker Lambda: runs queued analyses and posts the results

pub mod analyze;
pub mod deliver;
pub mod handler;

pub use analyze::{AnalysisFailure, AnalysisOutcome, DeliveryStep, run_analysis};
pub use handler::{handler, process_task};
