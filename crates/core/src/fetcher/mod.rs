//! Media acquisition: strategy variants, error taxonomy, fallback chain.

mod api;
mod chain;
mod error;
mod tool;
mod types;

pub use api::{StoryApiClient, StoryApiConfig};
pub use chain::{run_chain, Acquirer, PlatformAcquirer, Strategy};
pub use error::FetchError;
pub use tool::{classify_tool_failure, ToolFetcher, ToolKind};
pub use types::{AcquisitionResult, Artifact, FetchRequest};
