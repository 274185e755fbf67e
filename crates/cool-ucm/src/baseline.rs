//! UCM baselines.

use std::sync::Arc;

use chrono::NaiveDateTime;
use cool_core::{EntityKind, EntityRef, LabelStatus, PromotionLevel};
use serde::Serialize;
use tracing::info;

use crate::component::Component;
use crate::error::{Result, UcmError};
use crate::loader::{describe, optional_ref_field, ref_field};
use crate::registry::{EntityMap, Registered, Registry};
use crate::session::Session;
use crate::stream::Stream;
use crate::traits::{CreatedFlag, Identifiable, Loadable, StateSlot};

pub(crate) const BASELINE_FORMAT: &str = "%[name]p}{%[component]Xp}{%[bl_stream]Xp}{%[plevel]p}{%u}{%Nd}{%[label_status]p}{%[master]p";
const BASELINE_FIELDS: usize = 8;

/// Layout of the `%Nd` creation date.
pub const DATE_FORMAT: &str = "%Y%m%d.%H%M%S";

/// A snapshot of one component's versions.
#[derive(Debug)]
pub struct Baseline {
    reference: EntityRef,
    created: CreatedFlag,
    state: StateSlot<BaselineState>,
}

/// Loaded attributes of a baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaselineState {
    pub component: EntityRef,
    /// The stream the baseline was made in; imported baselines have none.
    pub stream: Option<EntityRef>,
    pub promotion_level: PromotionLevel,
    pub user: String,
    pub date: NaiveDateTime,
    pub label_status: LabelStatus,
    pub mastership: String,
}

impl Baseline {
    pub fn component(&self, session: &Session) -> Result<Arc<Component>> {
        session.identify(&self.state(session)?.component)
    }

    pub fn stream(&self, session: &Session) -> Result<Option<Arc<Stream>>> {
        self.state(session)?
            .stream
            .as_ref()
            .map(|r| session.identify(r))
            .transpose()
    }

    pub fn promotion_level(&self, session: &Session) -> Result<PromotionLevel> {
        self.with_state(session, |s| s.promotion_level)
    }

    pub fn date(&self, session: &Session) -> Result<NaiveDateTime> {
        self.with_state(session, |s| s.date)
    }

    pub fn user(&self, session: &Session) -> Result<String> {
        self.with_state(session, |s| s.user.clone())
    }

    pub fn label_status(&self, session: &Session) -> Result<LabelStatus> {
        self.with_state(session, |s| s.label_status)
    }

    /// Moves the baseline one step up the promotion ladder.
    ///
    /// `RELEASED` stays `RELEASED`. Only the promotion level of the cached
    /// state changes.
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::InvalidPromotion`] for a `REJECTED` baseline.
    pub fn promote(&self, session: &Session) -> Result<PromotionLevel> {
        let current = self.promotion_level(session)?;
        let next = current.promote().ok_or_else(|| UcmError::InvalidPromotion {
            reference: self.reference.clone(),
            level: current,
        })?;
        self.set_level(session, next)?;
        Ok(next)
    }

    /// Marks the baseline `REJECTED`.
    pub fn demote(&self, session: &Session) -> Result<PromotionLevel> {
        self.set_level(session, PromotionLevel::Rejected)?;
        Ok(PromotionLevel::Rejected)
    }

    fn set_level(&self, session: &Session, level: PromotionLevel) -> Result<()> {
        let target = self.reference.to_string();
        session
            .cleartool(&["chbl", "-level", level.as_str(), &target])
            .map_err(|e| UcmError::command(&self.reference, "chbl", e))?;
        info!(baseline = %self.reference, %level, "promotion level changed");
        self.state.update(|state| state.promotion_level = level);
        Ok(())
    }
}

impl Identifiable for Baseline {
    const KIND: EntityKind = EntityKind::Baseline;

    fn reference(&self) -> &EntityRef {
        &self.reference
    }

    fn is_created(&self) -> bool {
        self.created.get()
    }
}

impl Loadable for Baseline {
    type State = BaselineState;

    fn slot(&self) -> &StateSlot<BaselineState> {
        &self.state
    }

    fn fetch(&self, session: &Session) -> Result<BaselineState> {
        let r = &self.reference;
        let fields = describe(session, r, BASELINE_FORMAT, BASELINE_FIELDS)?;

        let date = NaiveDateTime::parse_from_str(fields[5].trim(), DATE_FORMAT)
            .map_err(|_| UcmError::malformed_field(r, "date", &fields[5]))?;
        let label_status = LabelStatus::parse_field(&fields[6])
            .map_err(|_| UcmError::malformed_field(r, "label_status", &fields[6]))?;

        Ok(BaselineState {
            component: ref_field(r, "component", EntityKind::Component, &fields[1])?,
            stream: optional_ref_field(r, "bl_stream", EntityKind::Stream, &fields[2])?,
            promotion_level: PromotionLevel::parse_lenient(&fields[3]),
            user: fields[4].trim().to_owned(),
            date,
            label_status,
            mastership: fields[7].trim().to_owned(),
        })
    }

    fn state_mastership(state: &BaselineState) -> &str {
        &state.mastership
    }
}

impl Registered for Baseline {
    fn placeholder(reference: EntityRef) -> Self {
        Self {
            reference,
            created: CreatedFlag::default(),
            state: StateSlot::default(),
        }
    }

    fn entity_map(registry: &Registry) -> &EntityMap<Self> {
        &registry.baselines
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, describe_cmd};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn loads_all_fields() {
        let fx = Fixture::new();
        fx.runner.respond(
            &describe_cmd(BASELINE_FORMAT, "baseline:bl_1@/vobs/pvob"),
            ["bl_1}{component:app@/vobs/pvob}{stream:dev@/vobs/pvob}{TESTED}{jdoe}{20120514.102831}{Full}{site1"],
        );
        let bl = fx.session.baseline("bl_1").unwrap();
        let state = bl.load(&fx.session).unwrap();

        assert_eq!(state.component.to_string(), "component:app@/vobs/pvob");
        assert_eq!(state.stream.as_ref().unwrap().name(), "dev");
        assert_eq!(state.promotion_level, PromotionLevel::Tested);
        assert_eq!(state.user, "jdoe");
        assert_eq!(
            state.date,
            NaiveDate::from_ymd_opt(2012, 5, 14)
                .unwrap()
                .and_hms_opt(10, 28, 31)
                .unwrap()
        );
        assert_eq!(state.label_status, LabelStatus::Full);
        assert_eq!(state.mastership, "site1");
    }

    #[test]
    fn imported_baseline_has_no_stream() {
        let fx = Fixture::new();
        fx.runner.respond(
            &describe_cmd(BASELINE_FORMAT, "baseline:imp@/vobs/pvob"),
            ["imp}{component:app@/vobs/pvob}{}{CUSTOM}{jdoe}{20120514.102831}{}{site1"],
        );
        let bl = fx.session.baseline("imp").unwrap();
        assert!(bl.stream(&fx.session).unwrap().is_none());
        assert_eq!(bl.promotion_level(&fx.session).unwrap(), PromotionLevel::Initial);
        assert_eq!(bl.label_status(&fx.session).unwrap(), LabelStatus::Unlabeled);
    }

    #[test]
    fn short_descriptor_is_malformed_and_stays_unloaded() {
        let fx = Fixture::new();
        fx.runner.respond(
            &describe_cmd(BASELINE_FORMAT, "baseline:bad@/vobs/pvob"),
            ["bad}{component:app@/vobs/pvob}{INITIAL"],
        );
        let bl = fx.session.baseline("bad").unwrap();
        let err = bl.load(&fx.session).unwrap_err();
        assert_eq!(err.kind(), "MalformedResponse");
        assert!(!bl.is_loaded());
    }

    #[test]
    fn bad_date_is_malformed() {
        let fx = Fixture::new();
        fx.runner.respond(
            &describe_cmd(BASELINE_FORMAT, "baseline:bad@/vobs/pvob"),
            ["bad}{component:app@/vobs/pvob}{}{INITIAL}{jdoe}{yesterday}{}{site1"],
        );
        let err = fx.session.baseline("bad").unwrap().load(&fx.session).unwrap_err();
        assert_eq!(err.kind(), "MalformedResponse");
    }

    #[test]
    fn promote_updates_only_the_level() {
        let fx = Fixture::new();
        fx.baseline("bl_1", "app", "dev", "BUILT", "20120514.102831");
        fx.runner.respond("chbl -level TESTED baseline:bl_1@/vobs/pvob", ["Changed."]);

        let bl = fx.session.baseline("bl_1").unwrap();
        let before = bl.load(&fx.session).unwrap();
        assert_eq!(bl.promote(&fx.session).unwrap(), PromotionLevel::Tested);

        let after = bl.state(&fx.session).unwrap();
        assert_eq!(after.promotion_level, PromotionLevel::Tested);
        assert_eq!(after.component, before.component);
        assert_eq!(after.date, before.date);
        assert_eq!(fx.runner.call_count(&describe_cmd(BASELINE_FORMAT, "baseline:bl_1@/vobs/pvob")), 1);
    }

    #[test]
    fn rejected_cannot_be_promoted() {
        let fx = Fixture::new();
        fx.baseline("bl_1", "app", "dev", "REJECTED", "20120514.102831");
        let err = fx.session.baseline("bl_1").unwrap().promote(&fx.session).unwrap_err();
        assert_eq!(err.kind(), "InvalidPromotion");
    }

    #[test]
    fn demote_rejects() {
        let fx = Fixture::new();
        fx.baseline("bl_1", "app", "dev", "TESTED", "20120514.102831");
        fx.runner.respond("chbl -level REJECTED baseline:bl_1@/vobs/pvob", ["Changed."]);
        let bl = fx.session.baseline("bl_1").unwrap();
        bl.load(&fx.session).unwrap();
        assert_eq!(bl.demote(&fx.session).unwrap(), PromotionLevel::Rejected);
        assert_eq!(bl.promotion_level(&fx.session).unwrap(), PromotionLevel::Rejected);
        assert_eq!(fx.runner.call_count(&describe_cmd(BASELINE_FORMAT, "baseline:bl_1@/vobs/pvob")), 1);
    }

    #[test]
    fn demote_before_load_reads_level_from_store() {
        let fx = Fixture::new();
        fx.runner.respond("chbl -level REJECTED baseline:bl_1@/vobs/pvob", ["Changed."]);
        let bl = fx.session.baseline("bl_1").unwrap();
        assert_eq!(bl.demote(&fx.session).unwrap(), PromotionLevel::Rejected);
        assert!(!bl.is_loaded());

        fx.baseline("bl_1", "app", "dev", "REJECTED", "20120514.102831");
        assert_eq!(bl.promotion_level(&fx.session).unwrap(), PromotionLevel::Rejected);
    }

    #[test]
    fn failed_auto_load_is_not_loaded() {
        let fx = Fixture::new();
        let bl = fx.session.baseline("missing").unwrap();
        let err = bl.component(&fx.session).unwrap_err();
        assert_eq!(err.kind(), "EntityNotLoaded");
        assert!(err.is_not_found());
        assert!(!bl.is_loaded());
    }
}
