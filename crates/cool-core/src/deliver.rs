//! Parsing of `cleartool deliver -status` output.
//!
//! The status report is free text. Only two shapes are recognised: the
//! explicit "no deliver operation" message and an in-progress report.
//! Anything else is kept as [`DeliverStatus::Unrecognized`] so callers can
//! tell "nothing in progress" apart from "could not tell".

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::enums::EntityKind;
use crate::entity::EntityRef;

/// The delivery state of a stream as reported by cleartool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliverStatus {
    /// No deliver operation is in progress.
    Idle,
    /// A deliver operation is in progress.
    InProgress(DeliveryInProgress),
    /// The report matched neither known shape.
    Unrecognized { raw: String },
}

/// Details of an in-progress delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryInProgress {
    /// The stream the delivery originates from.
    pub source: Option<EntityRef>,
    /// The stream being delivered into, when reported.
    pub target: Option<EntityRef>,
    /// Baselines named in the report, in report order.
    pub baselines: Vec<EntityRef>,
    /// Replica the operation was posted from, for multi-site deliveries.
    pub posted_from: Option<String>,
}

fn idle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)no deliver operation in progress").expect("valid regex"))
}

fn source_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)deliver operation in progress on stream "?([^"\s]+)"?"#)
            .expect("valid regex")
    })
}

fn target_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)delivered to (?:the default target )?stream "?([^"\s]+)"?"#)
            .expect("valid regex")
    })
}

fn posted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"Operation posted from(?: replica "([^"]*)")?"#).expect("valid regex")
    })
}

fn baseline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"baseline:[^\s"]+"#).expect("valid regex"))
}

impl DeliverStatus {
    /// Parses the full text of a `deliver -status` report.
    pub fn parse(text: &str) -> Self {
        if idle_re().is_match(text) {
            return Self::Idle;
        }

        let source = source_re().captures(text).map(|c| c[1].to_owned());
        // The phrase alone marks a posted delivery; the replica name is optional.
        let posted_from = posted_re()
            .captures(text)
            .map(|c| c.get(1).map(|m| m.as_str().to_owned()).unwrap_or_default());

        if source.is_none() && posted_from.is_none() {
            return Self::Unrecognized {
                raw: text.to_owned(),
            };
        }

        let source = match source {
            Some(s) => match EntityRef::parse_as(EntityKind::Stream, &s, None) {
                Ok(r) => Some(r),
                Err(_) => {
                    return Self::Unrecognized {
                        raw: text.to_owned(),
                    };
                }
            },
            None => None,
        };

        let target = target_re()
            .captures(text)
            .and_then(|c| EntityRef::parse_as(EntityKind::Stream, &c[1], None).ok());

        let baselines = baseline_re()
            .find_iter(text)
            .filter_map(|m| EntityRef::parse(m.as_str()).ok())
            .collect();

        Self::InProgress(DeliveryInProgress {
            source,
            target,
            baselines,
            posted_from,
        })
    }

    /// Returns `true` if a delivery is known to be in progress.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress(_))
    }

    /// Returns `true` if an in-progress delivery was posted from a replica.
    pub fn is_posted(&self) -> bool {
        matches!(
            self,
            Self::InProgress(DeliveryInProgress {
                posted_from: Some(_),
                ..
            })
        )
    }

    /// Returns `true` if the report could not be interpreted.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized { .. })
    }

    /// The delivering stream, if a delivery is in progress and reports one.
    pub fn source(&self) -> Option<&EntityRef> {
        match self {
            Self::InProgress(d) => d.source.as_ref(),
            _ => None,
        }
    }

    /// The replica an in-progress delivery was posted from.
    pub fn posted_from(&self) -> Option<&str> {
        match self {
            Self::InProgress(d) => d.posted_from.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const IN_PROGRESS: &str = r#"Deliver operation in progress on stream "stream:dev@/vobs/pvob"
Started by "jdoe" on "2012-05-14T10:28:31+02:00"
Using integration activity "deliver.dev.20120514.102831".
Using view "int_view".
Baselines will be delivered to the default target stream stream:int@/vobs/pvob in project "project:p@/vobs/pvob"
Baselines to be delivered:
	baseline:dev_1@/vobs/pvob
	baseline:dev_2@/vobs/pvob
"#;

    #[test]
    fn parses_idle() {
        let status = DeliverStatus::parse(r#"No deliver operation in progress on stream "stream:dev@/vob""#);
        assert_eq!(status, DeliverStatus::Idle);
        assert!(!status.is_in_progress());
        assert!(!status.is_posted());
    }

    #[test]
    fn parses_in_progress() {
        let status = DeliverStatus::parse(IN_PROGRESS);
        assert!(status.is_in_progress());
        assert!(!status.is_posted());
        assert_eq!(status.source().unwrap().to_string(), "stream:dev@/vobs/pvob");

        let DeliverStatus::InProgress(d) = status else {
            panic!("expected in-progress");
        };
        assert_eq!(d.target.unwrap().to_string(), "stream:int@/vobs/pvob");
        let names: Vec<_> = d.baselines.iter().map(|b| b.name().to_owned()).collect();
        assert_eq!(names, vec!["dev_1", "dev_2"]);
    }

    #[test]
    fn parses_posted_delivery() {
        let text = format!("{IN_PROGRESS}Operation posted from replica \"siteB\"\n");
        let status = DeliverStatus::parse(&text);
        assert!(status.is_posted());
        assert_eq!(status.posted_from(), Some("siteB"));
    }

    #[test]
    fn posted_replica_names_may_contain_punctuation() {
        let text = "Deliver operation in progress on stream \"stream:b@/vobs/pvob\"\nOperation posted from replica \"site-b.example\"";
        let status = DeliverStatus::parse(text);
        assert!(status.is_posted());
        assert_eq!(status.posted_from(), Some("site-b.example"));
    }

    #[test]
    fn posted_without_replica_name_is_still_posted() {
        let text = "Deliver operation in progress on stream \"stream:b@/vobs/pvob\"\nOperation posted from remote site";
        let status = DeliverStatus::parse(text);
        assert!(status.is_posted());
        assert_eq!(status.posted_from(), Some(""));
    }

    #[test]
    fn unknown_text_is_not_idle() {
        let status = DeliverStatus::parse("cleartool: Warning: something odd happened");
        assert!(status.is_unrecognized());
        assert!(!status.is_in_progress());
    }
}
