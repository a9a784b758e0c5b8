//! Observable loading state for asynchronous operations.
//!
//! A [`LoadingStateMachine`] holds the lifecycle of one operation (`NotStarted`,
//! `Loading`, `Success`, `Error`) together with its data or error, and publishes a
//! [`LoadingSnapshot`] on every transition. [`TrackLoadingExt`] binds any stream of
//! `Result`s to a machine so that the machine follows the stream on its own.

mod error;
mod feed;
mod lifecycle;
mod machine;
mod stream_ext;
mod track_loading;

pub use error::*;
pub use feed::SnapshotStream;
pub use lifecycle::*;
pub use machine::*;
pub use stream_ext::*;
pub use track_loading::*;

#[cfg(test)]
mod unit_tests;
