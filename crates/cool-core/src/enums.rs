//! Enum types for UCM entities.
//!
//! Each enum has:
//! - Serialize / Deserialize as its cleartool spelling
//! - `as_str()`, `ALL`, `Display` and `FromStr` impls

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Macro: defines a closed enum whose variants map 1:1 to cleartool tokens.
// ---------------------------------------------------------------------------
macro_rules! define_enum {
    (
        $(#[$meta:meta])*
        $name:ident,
        variants: [
            $( ($variant:ident, $str:expr) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[ $( Self::$variant, )+ ];

            /// Returns the cleartool spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $str => Ok(Self::$variant), )+
                    other => Err(UnknownVariant {
                        enum_name: stringify!($name),
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_str(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Returned when a string does not name any variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {enum_name} {value:?}")]
pub struct UnknownVariant {
    pub enum_name: &'static str,
    pub value: String,
}

// ===========================================================================
// EntityKind
// ===========================================================================

define_enum! {
    /// The object kind part of an entity reference.
    #[derive(PartialOrd, Ord)]
    EntityKind,
    variants: [
        (Project, "project"),
        (Stream, "stream"),
        (Baseline, "baseline"),
        (Component, "component"),
        (Activity, "activity"),
        (Hyperlink, "hlink"),
    ]
}

// ===========================================================================
// PromotionLevel
// ===========================================================================

define_enum! {
    /// Maturity stage of a baseline.
    ///
    /// `INITIAL < BUILT < TESTED < RELEASED`; `REJECTED` sits outside the
    /// promotion ladder.
    PromotionLevel,
    variants: [
        (Initial, "INITIAL"),
        (Built, "BUILT"),
        (Tested, "TESTED"),
        (Released, "RELEASED"),
        (Rejected, "REJECTED"),
    ]
}

impl PromotionLevel {
    /// The level a baseline moves to when promoted.
    ///
    /// `RELEASED` is a fixed point. `REJECTED` has no successor and is never
    /// produced here.
    pub fn promote(self) -> Option<Self> {
        match self {
            Self::Initial => Some(Self::Built),
            Self::Built => Some(Self::Tested),
            Self::Tested | Self::Released => Some(Self::Released),
            Self::Rejected => None,
        }
    }

    /// Position on the promotion ladder, `None` for `REJECTED`.
    pub fn rank(self) -> Option<u8> {
        match self {
            Self::Initial => Some(0),
            Self::Built => Some(1),
            Self::Tested => Some(2),
            Self::Released => Some(3),
            Self::Rejected => None,
        }
    }

    /// Parses cleartool output, falling back to `INITIAL` for unknown text.
    ///
    /// Sites may define custom promotion levels; those are treated as the
    /// bottom of the ladder.
    pub fn parse_lenient(s: &str) -> Self {
        match Self::from_str(s.trim()) {
            Ok(level) => level,
            Err(_) => {
                tracing::debug!(value = s, "unknown promotion level, using INITIAL");
                Self::Initial
            }
        }
    }
}

/// Compares positions on the promotion ladder. `REJECTED` is comparable
/// only with itself.
impl PartialOrd for PromotionLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            (None, None) => Some(std::cmp::Ordering::Equal),
            _ => None,
        }
    }
}

impl Default for PromotionLevel {
    fn default() -> Self {
        Self::Initial
    }
}

// ===========================================================================
// LabelStatus
// ===========================================================================

define_enum! {
    /// Whether a baseline's versions carry a label.
    LabelStatus,
    variants: [
        (Unlabeled, "Not Labeled"),
        (Incremental, "Incremental"),
        (Full, "Full"),
    ]
}

impl LabelStatus {
    /// Parses cleartool output; an empty field means "Not Labeled".
    pub fn parse_field(s: &str) -> Result<Self, UnknownVariant> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::Unlabeled);
        }
        Self::from_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_ladder() {
        use PromotionLevel::*;
        assert_eq!(Initial.promote(), Some(Built));
        assert_eq!(Built.promote(), Some(Tested));
        assert_eq!(Tested.promote(), Some(Released));
        assert_eq!(Released.promote(), Some(Released));
        assert_eq!(Rejected.promote(), None);
    }

    #[test]
    fn promote_never_yields_rejected() {
        for level in PromotionLevel::ALL {
            assert_ne!(level.promote(), Some(PromotionLevel::Rejected));
        }
    }

    #[test]
    fn promotion_rank_orders_the_ladder() {
        use PromotionLevel::*;
        assert!(Initial.rank() < Built.rank());
        assert!(Built.rank() < Tested.rank());
        assert!(Tested.rank() < Released.rank());
        assert_eq!(Rejected.rank(), None);
    }

    #[test]
    fn rejected_is_outside_the_ordering() {
        use PromotionLevel::*;
        assert!(Built < Tested);
        assert!(Released > Initial);
        assert_eq!(Rejected.partial_cmp(&Released), None);
        assert_eq!(Initial.partial_cmp(&Rejected), None);
        assert!(!(Rejected < Initial) && !(Rejected > Released));
        assert_eq!(Rejected.partial_cmp(&Rejected), Some(std::cmp::Ordering::Equal));
    }

    #[test]
    fn lenient_parse_defaults_to_initial() {
        assert_eq!(PromotionLevel::parse_lenient("TESTED\n"), PromotionLevel::Tested);
        assert_eq!(PromotionLevel::parse_lenient("CUSTOM"), PromotionLevel::Initial);
        assert_eq!(PromotionLevel::parse_lenient(""), PromotionLevel::Initial);
    }

    #[test]
    fn entity_kind_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_str(kind.as_str()).unwrap(), *kind);
        }
        assert!(EntityKind::from_str("widget").is_err());
    }

    #[test]
    fn label_status_empty_is_unlabeled() {
        assert_eq!(LabelStatus::parse_field("").unwrap(), LabelStatus::Unlabeled);
        assert_eq!(LabelStatus::parse_field("Full").unwrap(), LabelStatus::Full);
        assert!(LabelStatus::parse_field("Partly").is_err());
    }
}
