mod error;
mod router;
mod traits;
mod types;

pub use error::DeliveryError;
pub use router::DeliveryRouter;
pub use traits::{DirectTransport, LargeFileSession};
pub use types::{DeliveryConfig, DeliveryPath, DeliveryProgress};
