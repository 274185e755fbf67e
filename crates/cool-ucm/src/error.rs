//! UCM error types.

use std::sync::OnceLock;

use cool_cleartool::CommandError;
use cool_core::{DescriptorError, EntityRef, ParseRefError, TagParseError};
use regex::Regex;

/// Errors that can occur while reading or changing the UCM object graph.
#[derive(Debug, thiserror::Error)]
pub enum UcmError {
    /// The backing store does not know the entity.
    #[error("{reference} not found")]
    EntityNotFound {
        reference: EntityRef,
        #[source]
        source: CommandError,
    },

    /// An accessor needed the entity's state and loading it on demand
    /// failed. The entity stays unloaded.
    #[error("{reference} could not be loaded on demand")]
    EntityNotLoaded {
        reference: EntityRef,
        #[source]
        source: Box<UcmError>,
    },

    /// The descriptor query for an entity failed for a reason other than
    /// "not found" (including timeouts).
    #[error("failed to load {reference}")]
    LoadFailed {
        reference: EntityRef,
        #[source]
        source: CommandError,
    },

    /// A listing or mutation command failed.
    #[error("{operation} failed for {reference}")]
    CommandFailed {
        reference: EntityRef,
        operation: &'static str,
        #[source]
        source: CommandError,
    },

    /// A response did not have the shape its query asked for.
    #[error("malformed response for {reference}: {reason}")]
    MalformedResponse {
        reference: EntityRef,
        reason: MalformedReason,
    },

    /// A stream recommends more (or fewer) than one baseline where exactly
    /// one is required.
    #[error("{stream} recommends {count} baselines, expected exactly one")]
    AmbiguousRecommendation { stream: EntityRef, count: usize },

    /// A stream's recommended baseline belongs to another component than the
    /// list being compared against.
    #[error("recommended baseline of {stream} is in {found}, not {expected}")]
    ComponentMismatch {
        stream: EntityRef,
        expected: EntityRef,
        found: EntityRef,
    },

    /// A single top component was requested but the stream recommends
    /// none or several baselines.
    #[error("{stream} has no single top component ({count} recommended baselines)")]
    NoSingleTopComponent { stream: EntityRef, count: usize },

    /// Writing a tag to the backing store failed.
    #[error("failed to persist tag on {reference}")]
    TagPersistFailed {
        reference: EntityRef,
        #[source]
        source: CommandError,
    },

    /// A baseline cannot be promoted from its current level.
    #[error("{reference} cannot be promoted from {level}")]
    InvalidPromotion {
        reference: EntityRef,
        level: cool_core::PromotionLevel,
    },

    /// A user-supplied or response-embedded reference did not parse.
    #[error(transparent)]
    InvalidReference(#[from] ParseRefError),

    /// A user-supplied tag string did not parse.
    #[error(transparent)]
    InvalidTag(#[from] TagParseError),

    /// A list operation needs a stream/component context the list does not
    /// have.
    #[error("baseline list is not bound to a stream and component")]
    UnboundList,
}

/// What exactly was wrong with a response.
#[derive(Debug, thiserror::Error)]
pub enum MalformedReason {
    #[error(transparent)]
    FieldCount(#[from] DescriptorError),

    #[error("field {field} has unexpected value {value:?}")]
    Field { field: &'static str, value: String },
}

/// Convenience alias used throughout the UCM crate.
pub type Result<T> = std::result::Result<T, UcmError>;

fn not_found_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)Error: (?:(?:project|stream|baseline|component|activity|object) not found|Unable to determine object)",
        )
        .expect("valid regex")
    })
}

/// Returns `true` if the command failed because the object does not exist.
pub fn is_not_found(err: &CommandError) -> bool {
    not_found_re().is_match(err.stderr())
}

impl UcmError {
    // -- Constructors --------------------------------------------------------

    /// Classifies a failed descriptor query.
    pub fn load(reference: &EntityRef, source: CommandError) -> Self {
        if is_not_found(&source) {
            Self::EntityNotFound {
                reference: reference.clone(),
                source,
            }
        } else {
            Self::LoadFailed {
                reference: reference.clone(),
                source,
            }
        }
    }

    /// Wraps the failure of an on-demand load.
    pub fn not_loaded(reference: &EntityRef, source: UcmError) -> Self {
        Self::EntityNotLoaded {
            reference: reference.clone(),
            source: Box::new(source),
        }
    }

    /// Wraps a failed listing or mutation command.
    pub fn command(reference: &EntityRef, operation: &'static str, source: CommandError) -> Self {
        Self::CommandFailed {
            reference: reference.clone(),
            operation,
            source,
        }
    }

    /// A descriptor with the wrong number of fields.
    pub fn malformed(reference: &EntityRef, source: DescriptorError) -> Self {
        Self::MalformedResponse {
            reference: reference.clone(),
            reason: MalformedReason::FieldCount(source),
        }
    }

    /// A descriptor field that could not be interpreted.
    pub fn malformed_field(reference: &EntityRef, field: &'static str, value: &str) -> Self {
        Self::MalformedResponse {
            reference: reference.clone(),
            reason: MalformedReason::Field {
                field,
                value: value.to_owned(),
            },
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Stable name of the error kind, used in CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EntityNotFound { .. } => "EntityNotFound",
            Self::EntityNotLoaded { .. } => "EntityNotLoaded",
            Self::LoadFailed { .. } => "LoadFailed",
            Self::CommandFailed { .. } => "CommandFailed",
            Self::MalformedResponse { .. } => "MalformedResponse",
            Self::AmbiguousRecommendation { .. } => "AmbiguousRecommendation",
            Self::ComponentMismatch { .. } => "ComponentMismatch",
            Self::NoSingleTopComponent { .. } => "NoSingleTopComponent",
            Self::TagPersistFailed { .. } => "TagPersistFailed",
            Self::InvalidPromotion { .. } => "InvalidPromotion",
            Self::InvalidReference(_) => "InvalidReference",
            Self::InvalidTag(_) => "InvalidTag",
            Self::UnboundList => "UnboundList",
        }
    }

    /// Returns `true` if the entity does not exist, directly or as the cause
    /// of a failed on-demand load.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::EntityNotFound { .. } => true,
            Self::EntityNotLoaded { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns `true` if the underlying command was killed by the timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::LoadFailed { source, .. }
            | Self::CommandFailed { source, .. }
            | Self::TagPersistFailed { source, .. } => source.is_timeout(),
            Self::EntityNotLoaded { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LoadFailed { .. } | Self::CommandFailed { .. } => true,
            Self::EntityNotLoaded { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}
