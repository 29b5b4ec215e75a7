//! Network request tracking and interception.
//!
//! Two concerns live here, both fed from the `network.*` event stream:
//!
//! - [`NetworkEvents`], the per-browsing-context request state machine
//!   used to decide when a page has gone network-idle before printing
//! - the [`Interceptor`] protocol with its two concrete implementations,
//!   [`AddHeadersInterceptor`] and [`AuthInterceptor`]
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `events` | NetworkEvent / NetworkEvents state machine |
//! | `interceptor` | Interception capability interface |
//! | `headers` | Header-injection interceptor |
//! | `auth` | Authentication-challenge interceptor |

// ============================================================================
// Submodules
// ============================================================================

/// HTTP authentication interceptor.
pub mod auth;

/// Per-browsing-context network request tracking.
pub mod events;

/// Header-injection interceptor.
pub mod headers;

/// Request interception capability interface.
pub mod interceptor;

// ============================================================================
// Re-exports
// ============================================================================

pub use auth::AuthInterceptor;
pub use events::{NetworkEvent, NetworkEventState, NetworkEvents};
pub use headers::AddHeadersInterceptor;
pub use interceptor::Interceptor;
