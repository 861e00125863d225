mod classifier;
mod discovery;
mod job;
mod report;
mod resolver;
mod state;

pub use classifier::{OutcomeClassifier, truncate_chars};
pub use discovery::discover_jobs;
pub use job::{ExecutionResult, JobDescriptor, JobId, Outcome, SENTINEL_CODE};
pub use report::BatchReport;
pub use resolver::{JobResolver, NAME_PLACEHOLDER, PrefixStripStrategy, Resolution};
pub use state::{BatchLifecycle, BatchState};
