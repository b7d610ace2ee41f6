//! Testing utilities and mock implementations.
//!
//! Mocks for the external seams (acquisition, direct sends, chunked
//! uploads) so the scheduler and delivery pipeline can be tested end to
//! end without real tools or a live messaging backend.
//!
//! # Example
//!
//! ```rust,ignore
//! use clipflow_core::testing::{MockAcquirer, MockDirectTransport, MockLargeFileSession};
//!
//! let acquirer = MockAcquirer::new();
//! acquirer.push_error(FetchError::NoContent).await;
//!
//! let session = MockLargeFileSession::new();
//! session.fail_after_chunks(2).await;
//! ```

mod mock_acquirer;
mod mock_direct_transport;
mod mock_session;

pub use mock_acquirer::MockAcquirer;
pub use mock_direct_transport::{MockDirectTransport, RecordedSend};
pub use mock_session::{MockLargeFileSession, RecordedTransfer};
