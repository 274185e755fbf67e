//! Graph queries over streams.
//!
//! Child streams are filtered by delivery and mastership state, siblings are
//! found through the integration streams of every project in the scope, and
//! the delivering stream is searched among children first, then among all
//! streams of the project.

use std::collections::HashSet;
use std::sync::Arc;

use cool_core::descriptor::split_comma_list;
use cool_core::{EntityKind, EntityRef};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, UcmError, is_not_found};
use crate::loader::ref_list;
use crate::project::Project;
use crate::session::Session;
use crate::stream::Stream;
use crate::traits::{Identifiable, Loadable};

pub(crate) const CHILDREN_FORMAT: &str = "%[dstreams]CXp";

/// Why a child stream was left out of [`ChildStreams::streams`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Exclusion {
    /// A delivery posted from another replica is pending.
    PostedDelivery { replica: String },
    /// The child is mastered by another replica than its parent.
    ForeignMastership { mastership: String },
}

/// A child stream that was filtered out.
#[derive(Debug, Clone)]
pub struct ExcludedStream {
    pub stream: Arc<Stream>,
    pub reason: Exclusion,
}

/// Result of [`Stream::child_streams`].
#[derive(Debug, Clone, Default)]
pub struct ChildStreams {
    /// Children that passed the filter, in store order.
    pub streams: Vec<Arc<Stream>>,
    pub excluded: Vec<ExcludedStream>,
    /// Children whose deliver status report could not be interpreted. They
    /// are still subject to the mastership filter.
    pub unknown_status: Vec<EntityRef>,
}

impl ChildStreams {
    /// Every candidate that was examined, included or not.
    fn examined(&self) -> impl Iterator<Item = &EntityRef> {
        self.streams
            .iter()
            .map(|s| s.reference())
            .chain(self.excluded.iter().map(|e| e.stream.reference()))
    }
}

impl Stream {
    /// The streams that deliver to this one by default.
    ///
    /// A child with a delivery posted from another replica is left out
    /// unless `multisite_polling` is set. A child mastered elsewhere than
    /// this stream is always left out. A stream without children yields an
    /// empty result.
    pub fn child_streams(&self, session: &Session, multisite_polling: bool) -> Result<ChildStreams> {
        let mastership = self.mastership(session)?;
        let target = self.reference().to_string();

        let raw = match session.cleartool(&["describe", "-fmt", CHILDREN_FORMAT, &target]) {
            Ok(output) => output.stdout(),
            Err(e) if is_not_found(&e) => {
                debug!(stream = %self.reference(), "no child streams");
                return Ok(ChildStreams::default());
            }
            Err(e) => return Err(UcmError::command(self.reference(), "list child streams", e)),
        };
        let candidates = ref_list(
            self.reference(),
            "dstreams",
            EntityKind::Stream,
            split_comma_list(&raw),
        )?;

        let mut result = ChildStreams::default();
        for reference in candidates {
            let child: Arc<Stream> = session.identify(&reference)?;
            child.ensure_loaded(session)?;

            let status = child.refresh_deliver_status(session)?;
            if status.is_unrecognized() {
                warn!(stream = %reference, "deliver status unknown, keeping candidate");
                result.unknown_status.push(reference.clone());
            }
            if let Some(replica) = status.posted_from() {
                if !multisite_polling {
                    debug!(stream = %reference, replica, "excluding: posted delivery");
                    result.excluded.push(ExcludedStream {
                        stream: child,
                        reason: Exclusion::PostedDelivery {
                            replica: replica.to_owned(),
                        },
                    });
                    continue;
                }
            }

            let child_mastership = child.mastership(session)?;
            if child_mastership != mastership {
                debug!(stream = %reference, %child_mastership, "excluding: foreign mastership");
                result.excluded.push(ExcludedStream {
                    stream: child,
                    reason: Exclusion::ForeignMastership {
                        mastership: child_mastership,
                    },
                });
                continue;
            }

            result.streams.push(child);
        }
        Ok(result)
    }

    /// Streams of other projects whose integration stream delivers to this
    /// stream by default.
    pub fn sibling_streams(&self, session: &Session) -> Result<Vec<Arc<Stream>>> {
        let mut siblings = Vec::new();
        for project in Project::list(session, self.reference().scope())? {
            project.load(session)?;
            let Some(integration) = project.integration_stream(session)? else {
                continue;
            };
            let state = integration.load(session)?;
            if state.default_target.as_ref() == Some(self.reference()) {
                siblings.push(integration);
            }
        }
        Ok(siblings)
    }

    /// The stream with a delivery into this one in progress.
    ///
    /// Children are searched first, then every stream of the project. Each
    /// stream's deliver status is queried at most once per call.
    pub fn delivering_stream(
        &self,
        session: &Session,
        multisite_polling: bool,
    ) -> Result<Option<Arc<Stream>>> {
        let children = self.child_streams(session, multisite_polling)?;
        let mut fresh: HashSet<EntityRef> = children.examined().cloned().collect();

        if let Some(found) = find_delivering(session, &children.streams, &mut fresh)? {
            return Ok(Some(found));
        }

        let project = self.project(session)?;
        let streams = project.streams(session)?;
        find_delivering(session, &streams, &mut fresh)
    }
}

fn find_delivering(
    session: &Session,
    streams: &[Arc<Stream>],
    fresh: &mut HashSet<EntityRef>,
) -> Result<Option<Arc<Stream>>> {
    for stream in streams {
        let status = if fresh.contains(stream.reference()) {
            stream.deliver_status(session)?
        } else {
            fresh.insert(stream.reference().clone());
            stream.refresh_deliver_status(session)?
        };
        if status.is_in_progress() && status.source() == Some(stream.reference()) {
            debug!(stream = %stream.reference(), "found delivering stream");
            return Ok(Some(Arc::clone(stream)));
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
