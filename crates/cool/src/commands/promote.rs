//! `cool promote` -- raise a baseline one promotion level, or reject it.

use anyhow::Result;
use cool_ucm::Identifiable;

use crate::cli::PromoteArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `cool promote` command.
pub fn run(ctx: &RuntimeContext, args: &PromoteArgs) -> Result<()> {
    let session = ctx.session();
    let baseline = session.baseline(&args.baseline)?;
    let previous = baseline.promotion_level(session)?;
    let level = if args.reject {
        baseline.demote(session)?
    } else {
        baseline.promote(session)?
    };

    if ctx.json {
        output_json(&serde_json::json!({
            "baseline": baseline.reference(),
            "previous": previous,
            "level": level,
        }));
    } else if !ctx.quiet {
        println!("{}: {} -> {}", baseline.reference(), previous, level);
    }
    Ok(())
}
