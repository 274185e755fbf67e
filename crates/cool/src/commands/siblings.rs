//! `cool siblings` -- integration streams of other projects that target a stream.

use anyhow::Result;
use cool_ucm::Identifiable;

use crate::cli::StreamArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `cool siblings` command.
pub fn run(ctx: &RuntimeContext, args: &StreamArgs) -> Result<()> {
    let session = ctx.session();
    let stream = session.stream(&args.stream)?;
    let siblings: Vec<String> = stream
        .sibling_streams(session)?
        .iter()
        .map(|s| s.reference().to_string())
        .collect();

    if ctx.json {
        output_json(&siblings);
    } else if siblings.is_empty() {
        if !ctx.quiet {
            println!("No sibling streams of {}", stream.reference());
        }
    } else {
        for sibling in &siblings {
            println!("{sibling}");
        }
    }
    Ok(())
}
