//! `cool delivering` -- find the stream delivering into a stream.

use anyhow::Result;
use cool_ucm::Identifiable;

use crate::cli::DeliveringArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

/// Execute the `cool delivering` command.
pub fn run(ctx: &RuntimeContext, args: &DeliveringArgs) -> Result<()> {
    let session = ctx.session();
    let stream = session.stream(&args.stream)?;
    let polling = args.polling || session.settings().multisite_polling;
    let delivering = stream.delivering_stream(session, polling)?;
    let reference = delivering.as_ref().map(|s| s.reference().to_string());

    if ctx.json {
        output_json(&serde_json::json!({
            "target": stream.reference(),
            "delivering": reference,
        }));
    } else {
        match reference {
            Some(reference) => println!("{reference}"),
            None if !ctx.quiet => println!("No delivery into {} in progress", stream.reference()),
            None => {}
        }
    }
    Ok(())
}
