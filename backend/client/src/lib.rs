//! Browser-session side of the counters: an HTTP client for the server, the
//! per-browser "already acted" flags, and the optimistic sync controller that
//! ties them to what the page displays.
pub mod api;
pub mod controller;
pub mod error;
pub mod flags;

pub use api::{CounterApi, HttpApi};
pub use controller::{ClickOutcome, Confirmation, RetryableMutation, SyncController, SyncState};
pub use error::SyncError;
pub use flags::{FileFlags, FlagStore, MemoryFlags};
