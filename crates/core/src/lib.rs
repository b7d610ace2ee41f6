pub mod cleanup;
pub mod config;
pub mod credentials;
pub mod delivery;
pub mod fetcher;
pub mod limiter;
pub mod metrics;
pub mod platform;
pub mod retry;
pub mod scheduler;
pub mod testing;

pub use cleanup::CleanupCoordinator;
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use credentials::{CredentialEntry, CredentialError, CredentialStore};
pub use delivery::{
    DeliveryConfig, DeliveryError, DeliveryPath, DeliveryProgress, DeliveryRouter, DirectTransport,
    LargeFileSession,
};
pub use fetcher::{
    Acquirer, AcquisitionResult, Artifact, FetchError, FetchRequest, PlatformAcquirer,
    StoryApiClient, StoryApiConfig, ToolFetcher, ToolKind,
};
pub use limiter::RateLimiter;
pub use platform::{identify, Platform, PlatformError};
pub use retry::{retry_with_backoff, BackoffPolicy, ErrorClass, Retryable};
pub use scheduler::{Job, JobEvent, JobScheduler, JobState, SchedulerConfig, SchedulerError};
