//! Typed object graph over a UCM store.
//!
//! A [`Session`] wraps a [`cool_cleartool::CommandRunner`] and a
//! [`Registry`] that keeps exactly one instance per entity reference.
//! Entities start unloaded; accessors load them on first use through a
//! single `describe -fmt` query.
//!
//! ```no_run
//! use cool_cleartool::Cleartool;
//! use cool_ucm::{Identifiable, Loadable, Session, SessionSettings};
//!
//! let settings = SessionSettings {
//!     default_scope: Some("/vobs/PVOB".into()),
//!     ..SessionSettings::default()
//! };
//! let session = Session::with_settings(Cleartool::new(), settings);
//! let stream = session.stream("Integration")?;
//! for child in stream.child_streams(&session, false)?.streams {
//!     println!("{} is mastered at {}", child.reference(), child.mastership(&session)?);
//! }
//! # Ok::<(), cool_ucm::UcmError>(())
//! ```

pub mod baseline;
pub mod baseline_list;
pub mod component;
pub mod error;
mod loader;
pub mod navigator;
pub mod project;
pub mod registry;
pub mod session;
pub mod stream;
pub mod tags;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-exports for convenience.
pub use baseline::{Baseline, BaselineState};
pub use baseline_list::{BaselineList, ListContext};
pub use component::{Component, ComponentState};
pub use error::{MalformedReason, Result, UcmError};
pub use navigator::{ChildStreams, ExcludedStream, Exclusion};
pub use project::{Project, ProjectState};
pub use registry::{Registered, Registry};
pub use session::{Session, SessionSettings};
pub use stream::{CreateStream, Stream, StreamState};
pub use tags::{Tag, TagQuery};
pub use traits::{Identifiable, Loadable};
