//! Descriptor queries shared by the entity loaders.

use cool_core::descriptor::{optional_field, split_fields};
use cool_core::{EntityKind, EntityRef};

use crate::error::{Result, UcmError};
use crate::session::Session;

/// Runs `describe -fmt <format> <reference>` and splits the answer into
/// exactly `expected` fields.
pub(crate) fn describe(
    session: &Session,
    reference: &EntityRef,
    format: &str,
    expected: usize,
) -> Result<Vec<String>> {
    let target = reference.to_string();
    let output = session
        .cleartool(&["describe", "-fmt", format, &target])
        .map_err(|e| UcmError::load(reference, e))?;
    split_fields(&output.stdout(), expected).map_err(|e| UcmError::malformed(reference, e))
}

/// Runs a single-attribute `describe -fmt` query and returns raw stdout.
///
/// Unlike [`describe`], failures are reported as
/// [`UcmError::CommandFailed`] under `operation`.
pub(crate) fn describe_attribute(
    session: &Session,
    reference: &EntityRef,
    format: &str,
    operation: &'static str,
) -> Result<String> {
    let target = reference.to_string();
    session
        .cleartool(&["describe", "-fmt", format, &target])
        .map(|output| output.stdout())
        .map_err(|e| UcmError::command(reference, operation, e))
}

/// Parses a mandatory reference field of `owner`'s descriptor.
pub(crate) fn ref_field(
    owner: &EntityRef,
    field: &'static str,
    kind: EntityKind,
    value: &str,
) -> Result<EntityRef> {
    EntityRef::parse_as(kind, value, Some(owner.scope()))
        .map_err(|_| UcmError::malformed_field(owner, field, value))
}

/// Like [`ref_field`], but a blank field is `None`.
pub(crate) fn optional_ref_field(
    owner: &EntityRef,
    field: &'static str,
    kind: EntityKind,
    value: &str,
) -> Result<Option<EntityRef>> {
    optional_field(value)
        .map(|v| ref_field(owner, field, kind, v))
        .transpose()
}

/// Parses a list of references, one per item.
pub(crate) fn ref_list<I, S>(
    owner: &EntityRef,
    field: &'static str,
    kind: EntityKind,
    items: I,
) -> Result<Vec<EntityRef>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| ref_field(owner, field, kind, item.as_ref()))
        .collect()
}
