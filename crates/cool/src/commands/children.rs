//! `cool children` -- list the child streams of a stream.

use anyhow::Result;
use cool_ucm::{ChildStreams, Identifiable};
use serde::Serialize;

use crate::cli::ChildrenArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

#[derive(Serialize)]
struct ChildrenView<'a> {
    streams: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    excluded: Vec<ExcludedView<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unknown_status: Vec<String>,
}

#[derive(Serialize)]
struct ExcludedView<'a> {
    stream: String,
    #[serde(flatten)]
    reason: &'a cool_ucm::Exclusion,
}

/// Execute the `cool children` command.
///
/// `--polling` turns multi-site polling on; otherwise the configured value
/// applies.
pub fn run(ctx: &RuntimeContext, args: &ChildrenArgs) -> Result<()> {
    let session = ctx.session();
    let stream = session.stream(&args.stream)?;
    let polling = args.polling || session.settings().multisite_polling;
    let children = stream.child_streams(session, polling)?;

    if ctx.json {
        output_json(&view(&children, args.all));
        return Ok(());
    }

    let mut rows: Vec<Vec<String>> = children
        .streams
        .iter()
        .map(|s| vec![s.reference().to_string(), String::new()])
        .collect();
    if args.all {
        rows.extend(
            children
                .excluded
                .iter()
                .map(|e| vec![e.stream.reference().to_string(), describe_exclusion(&e.reason)]),
        );
    }

    if rows.is_empty() {
        if !ctx.quiet {
            println!("No child streams of {}", stream.reference());
        }
    } else if args.all {
        output_table(&["STREAM", "EXCLUDED"], &rows);
    } else {
        for row in &rows {
            println!("{}", row[0]);
        }
    }
    Ok(())
}

fn view(children: &ChildStreams, all: bool) -> ChildrenView<'_> {
    ChildrenView {
        streams: children.streams.iter().map(|s| s.reference().to_string()).collect(),
        excluded: if all {
            children
                .excluded
                .iter()
                .map(|e| ExcludedView {
                    stream: e.stream.reference().to_string(),
                    reason: &e.reason,
                })
                .collect()
        } else {
            Vec::new()
        },
        unknown_status: children.unknown_status.iter().map(ToString::to_string).collect(),
    }
}

fn describe_exclusion(reason: &cool_ucm::Exclusion) -> String {
    match reason {
        cool_ucm::Exclusion::PostedDelivery { replica } => format!("delivery posted from {replica}"),
        cool_ucm::Exclusion::ForeignMastership { mastership } => format!("mastered by {mastership}"),
    }
}
