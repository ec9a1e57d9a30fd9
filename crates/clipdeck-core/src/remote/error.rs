//! Remote control error types

use thiserror::Error;

/// Errors from a single control call
///
/// A non-2xx status counts as failure: the engine's response body is
/// ignored, so the status line is the only health signal we get.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The 5 second per-call timeout elapsed
    #[error("vMix API timeout")]
    Timeout,

    /// The engine answered with a non-success status
    #[error("vMix API returned HTTP {0}")]
    Status(u16),

    /// Connection refused/reset or other transport failure
    #[error("vMix API unreachable: {0}")]
    Network(String),
}
