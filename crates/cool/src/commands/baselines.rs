//! `cool baselines` -- list and filter the baselines of a component in a stream.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use cool_ucm::{BaselineList, Identifiable, TagQuery};
use serde::Serialize;

use crate::cli::BaselinesArgs;
use crate::context::RuntimeContext;
use crate::output::{output_json, output_table};

#[derive(Serialize)]
struct BaselineRow {
    baseline: String,
    promotion_level: String,
    date: NaiveDateTime,
    user: String,
}

/// Execute the `cool baselines` command.
///
/// Filters apply in order: level (server side), `--since`, `--tag`, then
/// `--newer-than-recommended`. The list stays newest first.
pub fn run(ctx: &RuntimeContext, args: &BaselinesArgs) -> Result<()> {
    let since = args.since.as_deref().map(parse_since).transpose()?;
    let tag_filter = match (&args.tag, &args.tag_type, &args.tag_id) {
        (Some(query), Some(tag_type), Some(tag_id)) => {
            Some((TagQuery::parse(query)?, tag_type.as_str(), tag_id.as_str()))
        }
        _ => None,
    };

    let session = ctx.session();
    let stream = session.stream(&args.stream)?;
    let component = session.component(&args.component)?;
    let mut list = BaselineList::query(session, &stream, &component, args.level)?;

    if let Some(since) = since {
        list = list.created_since(session, since)?;
    }
    if let Some((query, tag_type, tag_id)) = &tag_filter {
        list = list.filter(session, tag_type, tag_id, |tag| tag.matches(query))?;
    }
    if args.newer_than_recommended {
        list = list.newer_than_recommended(session)?;
    }

    let rows = list
        .iter()
        .map(|baseline| {
            Ok(BaselineRow {
                baseline: baseline.reference().to_string(),
                promotion_level: baseline.promotion_level(session)?.to_string(),
                date: baseline.date(session)?,
                user: baseline.user(session)?,
            })
        })
        .collect::<cool_ucm::Result<Vec<_>>>()?;

    if ctx.json {
        output_json(&rows);
    } else if rows.is_empty() {
        if !ctx.quiet {
            println!("No baselines");
        }
    } else {
        let table: Vec<Vec<String>> = rows
            .into_iter()
            .map(|r| {
                vec![
                    r.baseline,
                    r.promotion_level,
                    r.date.format("%Y-%m-%d %H:%M:%S").to_string(),
                    r.user,
                ]
            })
            .collect();
        output_table(&["BASELINE", "LEVEL", "DATE", "USER"], &table);
    }
    Ok(())
}

/// Parses `YYYY-MM-DD` as the start of that day.
fn parse_since(input: &str) -> Result<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("invalid --since date {input:?}, expected YYYY-MM-DD"))?;
    Ok(date.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn since_is_start_of_day() {
        let parsed = parse_since("2024-03-01").unwrap();
        assert_eq!(parsed.to_string(), "2024-03-01 00:00:00");
    }

    #[test]
    fn since_rejects_other_formats() {
        assert!(parse_since("01.03.2024").is_err());
        assert!(parse_since("2024-13-01").is_err());
    }
}
