//! `cool show` -- load an entity and print its attributes.

use std::sync::Arc;

use anyhow::{Result, bail};
use cool_core::{EntityKind, EntityRef};
use cool_ucm::{Baseline, Component, Loadable, Project, Stream};
use serde::Serialize;

use crate::cli::ShowArgs;
use crate::context::RuntimeContext;
use crate::output::{format_fields, format_list, format_optional, output_json};

/// An entity reference with its loaded state.
#[derive(Serialize)]
struct Shown<'a, S: Serialize> {
    reference: &'a EntityRef,
    #[serde(flatten)]
    state: &'a S,
}

/// Execute the `cool show` command.
///
/// Always loads afresh, so a missing entity reports `EntityNotFound`.
pub fn run(ctx: &RuntimeContext, args: &ShowArgs) -> Result<()> {
    let reference = ctx.entity_ref(&args.entity)?;
    let session = ctx.session();

    match reference.kind() {
        EntityKind::Project => {
            let project = session.identify::<Project>(&reference)?;
            let state = project.load(session)?;
            if ctx.json {
                output_json(&Shown { reference: &reference, state: state.as_ref() });
            } else {
                let fields = [
                    ("integration stream", format_optional(state.integration_stream.as_ref())),
                    ("mastership", state.mastership.clone()),
                ];
                println!("{}", format_fields(&reference.to_string(), &fields));
            }
        }
        EntityKind::Stream => {
            let stream = session.identify::<Stream>(&reference)?;
            let state = stream.load(session)?;
            if ctx.json {
                output_json(&Shown { reference: &reference, state: state.as_ref() });
            } else {
                let fields = [
                    ("project", state.project.to_string()),
                    ("default target", format_optional(state.default_target.as_ref())),
                    ("read only", state.read_only.to_string()),
                    ("foundations", format_list(&state.foundations)),
                    ("mastership", state.mastership.clone()),
                ];
                println!("{}", format_fields(&reference.to_string(), &fields));
            }
        }
        EntityKind::Baseline => {
            let baseline: Arc<Baseline> = session.identify(&reference)?;
            let state = baseline.load(session)?;
            if ctx.json {
                output_json(&Shown { reference: &reference, state: state.as_ref() });
            } else {
                let fields = [
                    ("component", state.component.to_string()),
                    ("stream", format_optional(state.stream.as_ref())),
                    ("promotion level", state.promotion_level.to_string()),
                    ("user", state.user.clone()),
                    ("date", state.date.format("%Y-%m-%d %H:%M:%S").to_string()),
                    ("label status", state.label_status.to_string()),
                    ("mastership", state.mastership.clone()),
                ];
                println!("{}", format_fields(&reference.to_string(), &fields));
            }
        }
        EntityKind::Component => {
            let component: Arc<Component> = session.identify(&reference)?;
            let state = component.load(session)?;
            if ctx.json {
                output_json(&Shown { reference: &reference, state: state.as_ref() });
            } else {
                let fields = [
                    ("root dir", format_optional(state.root_dir.as_ref())),
                    ("mastership", state.mastership.clone()),
                ];
                println!("{}", format_fields(&reference.to_string(), &fields));
            }
        }
        kind => bail!("{kind} entities have no attributes to show"),
    }

    Ok(())
}
