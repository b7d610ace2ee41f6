mod config;
mod runner;
mod types;

pub use config::SchedulerConfig;
pub use runner::JobScheduler;
pub use types::{Job, JobEvent, JobState, SchedulerError};
