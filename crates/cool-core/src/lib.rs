//! Core types for the COOL UCM client.
//!
//! Everything here is pure: entity references, enums, and the parsers for
//! the text formats cleartool produces. No process is ever spawned from
//! this crate.

pub mod deliver;
pub mod descriptor;
pub mod entity;
pub mod enums;
pub mod tag;

pub use deliver::{DeliverStatus, DeliveryInProgress};
pub use descriptor::DescriptorError;
pub use entity::{EntityRef, ParseRefError};
pub use enums::{EntityKind, LabelStatus, PromotionLevel};
pub use tag::{TagEntries, TagParseError, TagText};
