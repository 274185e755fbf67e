//! UCM streams: loader, accessors and mutations.
//!
//! Graph queries over streams (children, siblings, the delivering stream)
//! live in [`crate::navigator`].

use std::sync::{Arc, PoisonError, RwLock};

use cool_core::descriptor::split_space_list;
use cool_core::{DeliverStatus, EntityKind, EntityRef, PromotionLevel};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::baseline::Baseline;
use crate::component::Component;
use crate::error::{Result, UcmError, is_not_found};
use crate::loader::{describe, describe_attribute, optional_ref_field, ref_field, ref_list};
use crate::project::Project;
use crate::registry::{EntityMap, Registered, Registry};
use crate::session::Session;
use crate::traits::{Cached, CreatedFlag, Identifiable, Loadable, StateSlot};

pub(crate) const STREAM_FORMAT: &str =
    "%[name]p}{%[project]Xp}{%X[def_deliver_tgt]p}{%[read_only]p}{%[found_bls]Xp}{%[master]p";
const STREAM_FIELDS: usize = 6;

pub(crate) const RECOMMENDED_FORMAT: &str = "%[rec_bls]Xp";
pub(crate) const LATEST_FORMAT: &str = "%[latest_bls]Xp";
pub(crate) const VIEWS_FORMAT: &str = "%[views]p";

/// A line of development inside a project.
#[derive(Debug)]
pub struct Stream {
    reference: EntityRef,
    created: CreatedFlag,
    state: StateSlot<StreamState>,
    parent: RwLock<Option<Arc<Stream>>>,
    recommended: Cached<Vec<Arc<Baseline>>>,
    deliver_status: Cached<DeliverStatus>,
}

/// Loaded attributes of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamState {
    pub project: EntityRef,
    pub default_target: Option<EntityRef>,
    pub read_only: bool,
    /// May be empty.
    pub foundations: Vec<EntityRef>,
    pub mastership: String,
}

/// Options for [`Stream::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateStream {
    pub read_only: bool,
    pub foundations: Vec<EntityRef>,
}

impl Stream {
    // -- Accessors -----------------------------------------------------------

    pub fn project(&self, session: &Session) -> Result<Arc<Project>> {
        session.identify(&self.state(session)?.project)
    }

    pub fn default_target(&self, session: &Session) -> Result<Option<Arc<Stream>>> {
        self.state(session)?
            .default_target
            .as_ref()
            .map(|r| session.identify(r))
            .transpose()
    }

    pub fn is_read_only(&self, session: &Session) -> Result<bool> {
        self.with_state(session, |s| s.read_only)
    }

    pub fn foundation_baselines(&self, session: &Session) -> Result<Vec<Arc<Baseline>>> {
        self.state(session)?
            .foundations
            .iter()
            .map(|r| session.identify(r))
            .collect()
    }

    /// The first foundation baseline, if any.
    pub fn foundation_baseline(&self, session: &Session) -> Result<Option<Arc<Baseline>>> {
        Ok(self.foundation_baselines(session)?.into_iter().next())
    }

    /// The stream this one was created under in this session.
    pub fn parent(&self) -> Option<Arc<Stream>> {
        self.parent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_parent(&self, parent: Arc<Stream>) {
        *self.parent.write().unwrap_or_else(PoisonError::into_inner) = Some(parent);
    }

    // -- Baseline queries ----------------------------------------------------

    /// The recommended baselines, cached after the first query.
    pub fn recommended_baselines(
        &self,
        session: &Session,
        force: bool,
    ) -> Result<Vec<Arc<Baseline>>> {
        if force {
            self.recommended.clear();
        }
        self.recommended.get_or_try(|| {
            self.baseline_attribute(session, RECOMMENDED_FORMAT, "list recommended baselines")
        })
    }

    /// The latest baseline of each component in the stream.
    pub fn latest_baselines(&self, session: &Session) -> Result<Vec<Arc<Baseline>>> {
        self.baseline_attribute(session, LATEST_FORMAT, "list latest baselines")
    }

    fn baseline_attribute(
        &self,
        session: &Session,
        format: &str,
        operation: &'static str,
    ) -> Result<Vec<Arc<Baseline>>> {
        let raw = describe_attribute(session, &self.reference, format, operation)?;
        ref_list(&self.reference, operation, EntityKind::Baseline, split_space_list(&raw))?
            .iter()
            .map(|r| session.identify(r))
            .collect()
    }

    /// The component of the stream's only recommended baseline.
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::NoSingleTopComponent`] unless exactly one
    /// baseline is recommended.
    pub fn single_top_component(&self, session: &Session) -> Result<Arc<Component>> {
        let recommended = self.recommended_baselines(session, false)?;
        match recommended.as_slice() {
            [only] => only.component(session),
            _ => Err(UcmError::NoSingleTopComponent {
                stream: self.reference.clone(),
                count: recommended.len(),
            }),
        }
    }

    /// Tags of the views attached to the stream.
    pub fn views(&self, session: &Session) -> Result<Vec<String>> {
        let raw = describe_attribute(session, &self.reference, VIEWS_FORMAT, "list views")?;
        Ok(split_space_list(&raw))
    }

    // -- Delivery ------------------------------------------------------------

    /// The stream's delivery state, cached after the first query.
    pub fn deliver_status(&self, session: &Session) -> Result<DeliverStatus> {
        self.deliver_status
            .get_or_try(|| self.query_deliver_status(session))
    }

    /// Queries the delivery state again and caches it.
    pub fn refresh_deliver_status(&self, session: &Session) -> Result<DeliverStatus> {
        let status = self.query_deliver_status(session)?;
        Ok(self.deliver_status.set(status))
    }

    fn query_deliver_status(&self, session: &Session) -> Result<DeliverStatus> {
        let target = self.reference.to_string();
        let output = session
            .cleartool(&["deliver", "-status", "-stream", &target])
            .map_err(|e| UcmError::command(&self.reference, "deliver -status", e))?;
        let status = DeliverStatus::parse(&output.stdout());
        if status.is_unrecognized() {
            warn!(stream = %self.reference, "unrecognized deliver status report");
        }
        Ok(status)
    }

    /// Returns `true` if a delivery posted from another replica is pending.
    ///
    /// An unrecognized status report counts as "not posted".
    pub fn has_posted_delivery(&self, session: &Session) -> Result<bool> {
        Ok(self.deliver_status(session)?.is_posted())
    }

    /// The replica that originally mastered the stream: the posting replica
    /// of a pending posted delivery, otherwise the current mastership.
    pub fn original_mastership(&self, session: &Session) -> Result<String> {
        match self.deliver_status(session)?.posted_from() {
            Some(replica) => Ok(replica.to_owned()),
            None => self.mastership(session),
        }
    }

    /// Baselines of `component` at `level` carried by a pending posted
    /// delivery from this stream.
    pub fn posted_baselines(
        &self,
        session: &Session,
        component: &EntityRef,
        level: PromotionLevel,
    ) -> Result<Vec<Arc<Baseline>>> {
        let DeliverStatus::InProgress(delivery) = self.deliver_status(session)? else {
            return Ok(Vec::new());
        };
        if delivery.posted_from.is_none() {
            return Ok(Vec::new());
        }

        let mut posted = Vec::new();
        for reference in &delivery.baselines {
            let baseline: Arc<Baseline> = session.identify(reference)?;
            let state = baseline.state(session)?;
            if &state.component == component && state.promotion_level == level {
                posted.push(baseline);
            }
        }
        Ok(posted)
    }

    // -- Mutations -----------------------------------------------------------

    /// Creates a stream under `parent` (a project or a stream).
    pub fn create(
        session: &Session,
        parent: &EntityRef,
        name: &str,
        options: &CreateStream,
    ) -> Result<Arc<Stream>> {
        let reference = EntityRef::parse_as(EntityKind::Stream, name, Some(parent.scope()))?;
        let parent_arg = parent.to_string();
        Self::make(session, &reference, &["-in", &parent_arg], options)?;

        let stream: Arc<Stream> = session.identify(&reference)?;
        if parent.kind() == EntityKind::Stream {
            stream.set_parent(session.identify(parent)?);
        }
        Ok(stream)
    }

    /// Creates the integration stream of `project`.
    pub fn create_integration(
        session: &Session,
        project: &EntityRef,
        name: &str,
        foundations: &[EntityRef],
    ) -> Result<Arc<Stream>> {
        let reference = EntityRef::parse_as(EntityKind::Stream, name, Some(project.scope()))?;
        let project_arg = project.to_string();
        let options = CreateStream {
            read_only: false,
            foundations: foundations.to_vec(),
        };
        Self::make(
            session,
            &reference,
            &["-integration", "-in", &project_arg],
            &options,
        )?;
        session.identify(&reference)
    }

    fn make(
        session: &Session,
        reference: &EntityRef,
        placement: &[&str],
        options: &CreateStream,
    ) -> Result<()> {
        let foundations = options
            .foundations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let target = reference.to_string();

        let mut args = vec!["mkstream"];
        args.extend_from_slice(placement);
        if !foundations.is_empty() {
            args.extend(["-baseline", foundations.as_str()]);
        }
        if options.read_only {
            args.push("-readonly");
        }
        args.push(&target);

        session
            .cleartool(&args)
            .map_err(|e| UcmError::command(reference, "mkstream", e))?;
        info!(stream = %reference, "stream created");

        // A stream of the same name may have been removed earlier.
        let stream: Arc<Stream> = session.identify(reference)?;
        stream.state.invalidate();
        stream.recommended.clear();
        stream.deliver_status.clear();
        stream.created.set();
        Ok(())
    }

    /// Sets the default delivery target. Only that field of a loaded state
    /// changes.
    pub fn set_default_target(&self, session: &Session, target: &Stream) -> Result<()> {
        let target_arg = target.reference().to_string();
        let me = self.reference.to_string();
        session
            .cleartool(&["chstream", "-target", &target_arg, &me])
            .map_err(|e| UcmError::command(&self.reference, "chstream -target", e))?;
        info!(stream = %self.reference, target = %target.reference(), "default target set");
        let new_target = target.reference().clone();
        self.state
            .update(|state| state.default_target = Some(new_target));
        Ok(())
    }

    /// Recommends `baseline`, optionally generating recommendations first.
    pub fn recommend_baseline(
        &self,
        session: &Session,
        baseline: &Baseline,
        generate: bool,
    ) -> Result<()> {
        let baseline_arg = baseline.reference().to_string();
        let me = self.reference.to_string();
        let mut args = vec!["chstream"];
        if generate {
            args.push("-generate");
        }
        args.extend(["-recommend", baseline_arg.as_str(), me.as_str()]);
        session
            .cleartool(&args)
            .map_err(|e| UcmError::command(&self.reference, "chstream -recommend", e))?;
        info!(stream = %self.reference, baseline = %baseline.reference(), "baseline recommended");
        self.recommended.clear();
        Ok(())
    }

    /// Regenerates the stream's recommended baselines.
    pub fn generate(&self, session: &Session) -> Result<()> {
        let me = self.reference.to_string();
        session
            .cleartool(&["chstream", "-generate", &me])
            .map_err(|e| UcmError::command(&self.reference, "chstream -generate", e))?;
        self.recommended.clear();
        Ok(())
    }

    /// Removes the stream from the store and forgets the cached instance.
    pub fn remove(&self, session: &Session) -> Result<()> {
        let me = self.reference.to_string();
        session
            .cleartool(&["rmstream", "-force", &me])
            .map_err(|e| UcmError::command(&self.reference, "rmstream", e))?;
        info!(stream = %self.reference, "stream removed");
        session.registry().forget::<Stream>(&self.reference);
        Ok(())
    }

    /// Returns `true` if the store knows the stream.
    pub fn exists(&self, session: &Session) -> Result<bool> {
        let me = self.reference.to_string();
        match session.cleartool(&["describe", &me]) {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => {
                debug!(stream = %self.reference, "stream does not exist");
                Ok(false)
            }
            Err(e) => Err(UcmError::command(&self.reference, "describe", e)),
        }
    }
}

impl Identifiable for Stream {
    const KIND: EntityKind = EntityKind::Stream;

    fn reference(&self) -> &EntityRef {
        &self.reference
    }

    fn is_created(&self) -> bool {
        self.created.get()
    }
}

impl Loadable for Stream {
    type State = StreamState;

    fn slot(&self) -> &StateSlot<StreamState> {
        &self.state
    }

    fn fetch(&self, session: &Session) -> Result<StreamState> {
        let r = &self.reference;
        let fields = describe(session, r, STREAM_FORMAT, STREAM_FIELDS)?;
        Ok(StreamState {
            project: ref_field(r, "project", EntityKind::Project, &fields[1])?,
            default_target: optional_ref_field(r, "def_deliver_tgt", EntityKind::Stream, &fields[2])?,
            read_only: !fields[3].trim().is_empty(),
            foundations: ref_list(
                r,
                "found_bls",
                EntityKind::Baseline,
                split_space_list(&fields[4]),
            )?,
            mastership: fields[5].trim().to_owned(),
        })
    }

    fn state_mastership(state: &StreamState) -> &str {
        &state.mastership
    }
}

impl Registered for Stream {
    fn placeholder(reference: EntityRef) -> Self {
        Self {
            reference,
            created: CreatedFlag::default(),
            state: StateSlot::default(),
            parent: RwLock::new(None),
            recommended: Cached::default(),
            deliver_status: Cached::default(),
        }
    }

    fn entity_map(registry: &Registry) -> &EntityMap<Self> {
        &registry.streams
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
