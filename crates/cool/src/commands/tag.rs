//! `cool set-tag` / `cool get-tag` -- key/value tags stored as hyperlinks.

use anyhow::Result;
use cool_core::TagEntries;
use cool_ucm::{Tag, UcmError};

use crate::cli::{GetTagArgs, SetTagArgs};
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

/// Execute the `cool set-tag` command.
///
/// Entries are merged into the stored tag; keys not named keep their value.
pub fn run_set(ctx: &RuntimeContext, args: &SetTagArgs) -> Result<()> {
    // Validate before talking to cleartool.
    let updates = TagEntries::parse(&args.tags).map_err(UcmError::from)?;
    let entity = ctx.entity_ref(&args.entity)?;
    let session = ctx.session();

    let mut tag = Tag::get(session, &entity, &args.tag_type, &args.tag_id)?;
    for (key, value) in updates.iter() {
        tag.set_entry(key, value)?;
    }
    tag.persist(session)?;

    if ctx.json {
        output_json(&tag);
    } else if !ctx.quiet {
        let verb = if tag.created() { "Created" } else { "Updated" };
        println!("{} tag {}/{} on {}: {}", verb, tag.tag_type(), tag.tag_id(), entity, tag.entries());
    }
    Ok(())
}

/// Execute the `cool get-tag` command.
pub fn run_get(ctx: &RuntimeContext, args: &GetTagArgs) -> Result<()> {
    let entity = ctx.entity_ref(&args.entity)?;
    let tag = Tag::get(ctx.session(), &entity, &args.tag_type, &args.tag_id)?;

    if ctx.json {
        output_json(&tag);
    } else if tag.entries().is_empty() {
        if !ctx.quiet {
            println!("No {}/{} tag on {}", tag.tag_type(), tag.tag_id(), entity);
        }
    } else {
        let rows: Vec<Vec<String>> = tag
            .entries()
            .iter()
            .map(|(key, value)| vec![key.to_string(), value.to_string()])
            .collect();
        output_table(&["KEY", "VALUE"], &rows);
    }
    Ok(())
}
