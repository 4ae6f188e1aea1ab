//! Application glue that sits next to the transition queue.

/// In-flight call tracking.
pub mod connecting;
/// Screen-to-screen value hand-off.
pub mod handoff;

pub use connecting::{ConnectingApiStatus, TrackedApiStatus, track_call};
pub use handoff::{HandoffContainer, HandoffError};
