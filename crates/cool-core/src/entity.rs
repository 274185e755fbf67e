//! Entity references: the identity of a UCM object.
//!
//! Every UCM object is addressed as `kind:name@scope`, e.g.
//! `stream:Integration@/vobs/PVOB`. The canonical string form is the cache
//! key used by the entity registry, so two references are equal exactly
//! when their canonical forms are equal.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::enums::EntityKind;

/// A fully-qualified reference to a UCM entity.
///
/// Rendered as `kind:name@scope`. The scope is the project VOB the entity
/// lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    kind: EntityKind,
    name: String,
    scope: String,
}

impl EntityRef {
    /// Builds a reference from its parts, validating the name and scope.
    pub fn new(
        kind: EntityKind,
        name: impl Into<String>,
        scope: impl Into<String>,
    ) -> Result<Self, ParseRefError> {
        let name = name.into();
        let scope = scope.into();
        validate_name(&name)?;
        if scope.trim().is_empty() || scope.chars().any(char::is_whitespace) {
            return Err(ParseRefError::InvalidScope(scope));
        }
        Ok(Self { kind, name, scope })
    }

    /// Parses a canonical `kind:name@scope` string.
    ///
    /// The kind prefix and the scope are both mandatory here; use
    /// [`EntityRef::parse_as`] when the kind is known from context.
    pub fn parse(input: &str) -> Result<Self, ParseRefError> {
        let input = input.trim();
        let (prefix, rest) = input
            .split_once(':')
            .ok_or_else(|| ParseRefError::MissingKind(input.to_owned()))?;
        let kind = EntityKind::from_str(prefix)
            .map_err(|_| ParseRefError::UnknownKind(prefix.to_owned()))?;
        let (name, scope) = rest
            .split_once('@')
            .ok_or_else(|| ParseRefError::MissingScope(input.to_owned()))?;
        Self::new(kind, name, scope)
    }

    /// Parses a reference whose kind is known from context.
    ///
    /// The `kind:` prefix is optional and normalized on. If the input has no
    /// `@scope` part, `default_scope` is used; without one the input is
    /// rejected.
    pub fn parse_as(
        kind: EntityKind,
        input: &str,
        default_scope: Option<&str>,
    ) -> Result<Self, ParseRefError> {
        let input = input.trim();
        let rest = match input.split_once(':') {
            Some((prefix, rest)) if EntityKind::from_str(prefix).is_ok() => {
                if prefix != kind.as_str() {
                    return Err(ParseRefError::KindMismatch {
                        expected: kind,
                        input: input.to_owned(),
                    });
                }
                rest
            }
            _ => input,
        };

        match rest.split_once('@') {
            Some((name, scope)) => Self::new(kind, name, scope),
            None => match default_scope {
                Some(scope) => Self::new(kind, rest, scope),
                None => Err(ParseRefError::MissingScope(input.to_owned())),
            },
        }
    }

    /// Returns the entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the short name (without kind and scope).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope (project VOB).
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.kind, self.name, self.scope)
    }
}

impl FromStr for EntityRef {
    type Err = ParseRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for EntityRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn validate_name(name: &str) -> Result<(), ParseRefError> {
    if name.is_empty()
        || name.contains('@')
        || name.contains(':')
        || name.chars().any(char::is_whitespace)
    {
        return Err(ParseRefError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// Errors returned when parsing an entity reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRefError {
    #[error("invalid entity reference: expected kind:name@scope, got {0:?}")]
    MissingKind(String),

    #[error("unknown entity kind {0:?}")]
    UnknownKind(String),

    #[error("entity reference {0:?} has no @scope and no default scope is configured")]
    MissingScope(String),

    #[error("expected a {expected} reference, got {input:?}")]
    KindMismatch { expected: EntityKind, input: String },

    #[error("invalid entity name {0:?}")]
    InvalidName(String),

    #[error("invalid entity scope {0:?}")]
    InvalidScope(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_canonical_form() {
        let r = EntityRef::parse("stream:Integration@/vobs/PVOB").unwrap();
        assert_eq!(r.kind(), EntityKind::Stream);
        assert_eq!(r.name(), "Integration");
        assert_eq!(r.scope(), "/vobs/PVOB");
        assert_eq!(r.to_string(), "stream:Integration@/vobs/PVOB");
    }

    #[test]
    fn windows_scope_round_trips() {
        let r = EntityRef::parse(r"baseline:bl_1.0@\PVOB").unwrap();
        assert_eq!(r.scope(), r"\PVOB");
        assert_eq!(EntityRef::parse(&r.to_string()).unwrap(), r);
    }

    #[test]
    fn equality_follows_canonical_form() {
        let a = EntityRef::parse("stream:dev@/vob").unwrap();
        let b = EntityRef::parse_as(EntityKind::Stream, "dev@/vob", None).unwrap();
        let c = EntityRef::parse("project:dev@/vob").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn parse_as_normalizes_prefix_and_default_scope() {
        let r = EntityRef::parse_as(EntityKind::Baseline, "bl_2", Some("/vob")).unwrap();
        assert_eq!(r.to_string(), "baseline:bl_2@/vob");

        let err = EntityRef::parse_as(EntityKind::Baseline, "bl_2", None).unwrap_err();
        assert!(matches!(err, ParseRefError::MissingScope(_)));
    }

    #[test]
    fn parse_as_rejects_other_kind() {
        let err = EntityRef::parse_as(EntityKind::Stream, "project:p@/vob", None).unwrap_err();
        assert!(matches!(err, ParseRefError::KindMismatch { .. }));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(EntityRef::parse("no-kind@/vob").is_err());
        assert!(EntityRef::parse("widget:x@/vob").is_err());
        assert!(EntityRef::parse("stream:x").is_err());
        assert!(EntityRef::parse("stream:@/vob").is_err());
        assert!(EntityRef::parse("stream:a b@/vob").is_err());
    }

    #[test]
    fn serde_uses_canonical_string() {
        let r = EntityRef::parse("component:Model@/vob").unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"component:Model@/vob\"");
        let back: EntityRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
