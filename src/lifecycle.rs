//! # Lifecycle
//!
//! Explicit release of owned resources. Values held by the settings cache and
//! services registered as owned implement [`Dispose`]; disposal is a one-time
//! event, and implementations make repeated calls no-ops.

use crate::error::SetupResult;

/// A value that owns resources which must be released exactly once
pub trait Dispose: Send + Sync {
    /// Release owned resources. Calling this again after a successful or
    /// failed release must not release anything twice.
    fn dispose(&self) -> SetupResult<()>;
}
