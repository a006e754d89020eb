pub mod error;
pub mod types;

#[cfg(feature = "margin")]
pub mod margin;

#[cfg(feature = "capture")]
pub mod capture;

#[cfg(feature = "snapshot")]
pub mod snapshot;

pub use error::CaptureError;
pub use types::*;

/// Standard result type for all sgx-capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;
