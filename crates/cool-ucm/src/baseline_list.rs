//! Ordered baseline collections and the operations over them.
//!
//! Lists are newest-first. A list built by [`BaselineList::query`] is bound
//! to the stream and component it was listed for; operations that derive a
//! new list keep that binding.

use std::sync::Arc;

use chrono::NaiveDateTime;
use cool_core::{EntityKind, PromotionLevel};
use tracing::debug;

use crate::baseline::Baseline;
use crate::component::Component;
use crate::error::{Result, UcmError};
use crate::loader::ref_list;
use crate::session::Session;
use crate::stream::Stream;
use crate::tags::Tag;
use crate::traits::Identifiable;

/// The stream and component a list was built for.
#[derive(Debug, Clone)]
pub struct ListContext {
    pub stream: Arc<Stream>,
    pub component: Arc<Component>,
}

/// A newest-first sequence of baselines.
#[derive(Debug, Clone, Default)]
pub struct BaselineList {
    baselines: Vec<Arc<Baseline>>,
    context: Option<ListContext>,
}

impl BaselineList {
    /// An unbound list; `baselines` must already be newest-first.
    pub fn new(baselines: Vec<Arc<Baseline>>) -> Self {
        Self {
            baselines,
            context: None,
        }
    }

    /// A list bound to `stream` and `component`.
    pub fn bound(
        stream: Arc<Stream>,
        component: Arc<Component>,
        baselines: Vec<Arc<Baseline>>,
    ) -> Self {
        Self {
            baselines,
            context: Some(ListContext { stream, component }),
        }
    }

    /// Lists the baselines of `component` made in `stream`, optionally only
    /// those at `level`.
    pub fn query(
        session: &Session,
        stream: &Arc<Stream>,
        component: &Arc<Component>,
        level: Option<PromotionLevel>,
    ) -> Result<Self> {
        let component_arg = component.reference().to_string();
        let stream_arg = stream.reference().to_string();
        let mut args = vec![
            "lsbl",
            "-s",
            "-component",
            component_arg.as_str(),
            "-stream",
            stream_arg.as_str(),
        ];
        if let Some(level) = level {
            args.extend(["-level", level.as_str()]);
        }

        let output = session
            .cleartool(&args)
            .map_err(|e| UcmError::command(stream.reference(), "lsbl", e))?;
        let names: Vec<&str> = output
            .stdout_lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();

        // lsbl lists oldest first.
        let mut baselines = ref_list(component.reference(), "lsbl", EntityKind::Baseline, names)?
            .iter()
            .map(|r| session.identify(r))
            .collect::<Result<Vec<Arc<Baseline>>>>()?;
        baselines.reverse();
        debug!(stream = %stream.reference(), component = %component.reference(), count = baselines.len(), "listed baselines");

        Ok(Self::bound(Arc::clone(stream), Arc::clone(component), baselines))
    }

    pub fn context(&self) -> Option<&ListContext> {
        self.context.as_ref()
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Baseline>> {
        self.baselines.iter()
    }

    pub fn as_slice(&self) -> &[Arc<Baseline>] {
        &self.baselines
    }

    pub fn into_vec(self) -> Vec<Arc<Baseline>> {
        self.baselines
    }

    fn derive(&self, baselines: Vec<Arc<Baseline>>) -> Self {
        Self {
            baselines,
            context: self.context.clone(),
        }
    }

    /// Keeps the baselines whose `tag_type`/`tag_id` tag satisfies
    /// `predicate`. Baselines without such a tag see an empty tag.
    pub fn filter(
        &self,
        session: &Session,
        tag_type: &str,
        tag_id: &str,
        predicate: impl Fn(&Tag) -> bool,
    ) -> Result<Self> {
        let mut kept = Vec::new();
        for baseline in &self.baselines {
            let tag = Tag::get(session, baseline.reference(), tag_type, tag_id)?;
            if predicate(&tag) {
                kept.push(Arc::clone(baseline));
            }
        }
        Ok(self.derive(kept))
    }

    /// Drops baselines created before `date`.
    pub fn created_since(&self, session: &Session, date: NaiveDateTime) -> Result<Self> {
        let mut kept = Vec::new();
        for baseline in &self.baselines {
            if baseline.date(session)? >= date {
                kept.push(Arc::clone(baseline));
            }
        }
        Ok(self.derive(kept))
    }

    /// The baselines newer than the bound stream's recommended baseline.
    ///
    /// Starting from the oldest end, baselines are dropped up to and
    /// including the recommended one. If the recommended baseline is not in
    /// the list, the result is empty.
    ///
    /// # Errors
    ///
    /// - [`UcmError::UnboundList`] if the list has no stream/component.
    /// - [`UcmError::AmbiguousRecommendation`] unless the stream recommends
    ///   exactly one baseline.
    /// - [`UcmError::ComponentMismatch`] if that baseline is of another
    ///   component than the list.
    pub fn newer_than_recommended(&self, session: &Session) -> Result<Self> {
        let context = self.context.as_ref().ok_or(UcmError::UnboundList)?;
        let stream = context.stream.reference();

        let recommended = context.stream.recommended_baselines(session, true)?;
        let [recommended] = recommended.as_slice() else {
            return Err(UcmError::AmbiguousRecommendation {
                stream: stream.clone(),
                count: recommended.len(),
            });
        };

        let rec_component = recommended.component(session)?;
        if rec_component.reference() != context.component.reference() {
            return Err(UcmError::ComponentMismatch {
                stream: stream.clone(),
                expected: context.component.reference().clone(),
                found: rec_component.reference().clone(),
            });
        }

        let mut remaining = self.baselines.clone();
        while let Some(oldest) = remaining.pop() {
            if oldest.reference() == recommended.reference() {
                return Ok(self.derive(remaining));
            }
        }
        debug!(%stream, recommended = %recommended.reference(), "recommended baseline not in list");
        Ok(self.derive(Vec::new()))
    }
}

impl<'a> IntoIterator for &'a BaselineList {
    type Item = &'a Arc<Baseline>;
    type IntoIter = std::slice::Iter<'a, Arc<Baseline>>;

    fn into_iter(self) -> Self::IntoIter {
        self.baselines.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagQuery;
    use crate::testing::Fixture;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const LSBL: &str = "lsbl -s -component component:app@/vobs/pvob -stream stream:int@/vobs/pvob";

    fn names(list: &BaselineList) -> Vec<&str> {
        list.iter().map(|b| b.reference().name()).collect()
    }

    /// `int` lists b1..b5 for `app`, recommending `rec`.
    fn listed(fx: &Fixture, rec: &[&str]) -> BaselineList {
        fx.runner.respond(LSBL, ["b1", "b2", "b3", "b4", "b5"]);
        fx.recommended("int", rec);
        for (i, name) in ["b1", "b2", "b3", "b4", "b5"].iter().enumerate() {
            fx.baseline(name, "app", "int", "BUILT", &format!("2012051{i}.120000"));
        }
        fx.baseline("other", "lib", "int", "BUILT", "20120510.120000");
        let stream = fx.session.stream("int").unwrap();
        let component = fx.session.component("app").unwrap();
        BaselineList::query(&fx.session, &stream, &component, None).unwrap()
    }

    #[test]
    fn query_is_newest_first_and_bound() {
        let fx = Fixture::new();
        let list = listed(&fx, &["b3"]);
        assert_eq!(names(&list), vec!["b5", "b4", "b3", "b2", "b1"]);
        assert_eq!(list.context().unwrap().stream.reference().name(), "int");
    }

    #[test]
    fn query_with_level() {
        let fx = Fixture::new();
        fx.runner.respond(&format!("{LSBL} -level TESTED"), ["b2"]);
        let stream = fx.session.stream("int").unwrap();
        let component = fx.session.component("app").unwrap();
        let list =
            BaselineList::query(&fx.session, &stream, &component, Some(PromotionLevel::Tested))
                .unwrap();
        assert_eq!(names(&list), vec!["b2"]);
    }

    #[test]
    fn newer_than_recommended() {
        let fx = Fixture::new();
        let list = listed(&fx, &["b3"]);
        let newer = list.newer_than_recommended(&fx.session).unwrap();
        assert_eq!(names(&newer), vec!["b5", "b4"]);
        assert!(newer.context().is_some());
    }

    #[test]
    fn newest_recommended_leaves_nothing() {
        let fx = Fixture::new();
        let list = listed(&fx, &["b5"]);
        assert!(list.newer_than_recommended(&fx.session).unwrap().is_empty());
    }

    #[test]
    fn recommended_not_in_list_leaves_nothing() {
        let fx = Fixture::new();
        fx.baseline("b0", "app", "int", "BUILT", "20120501.120000");
        let list = listed(&fx, &["b0"]);
        assert!(list.newer_than_recommended(&fx.session).unwrap().is_empty());
    }

    #[test]
    fn two_recommended_is_ambiguous() {
        let fx = Fixture::new();
        let list = listed(&fx, &["b3", "b4"]);
        let err = list.newer_than_recommended(&fx.session).unwrap_err();
        assert!(matches!(err, UcmError::AmbiguousRecommendation { count: 2, .. }));
    }

    #[test]
    fn foreign_component_is_mismatch() {
        let fx = Fixture::new();
        let list = listed(&fx, &["other"]);
        let err = list.newer_than_recommended(&fx.session).unwrap_err();
        assert_eq!(err.kind(), "ComponentMismatch");
    }

    #[test]
    fn unbound_list_is_rejected() {
        let fx = Fixture::new();
        let list = BaselineList::new(vec![fx.session.baseline("b1").unwrap()]);
        let err = list.newer_than_recommended(&fx.session).unwrap_err();
        assert_eq!(err.kind(), "UnboundList");
    }

    #[test]
    fn created_since_keeps_newer() {
        let fx = Fixture::new();
        let list = listed(&fx, &["b3"]);
        let since = NaiveDate::from_ymd_opt(2012, 5, 13)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let recent = list.created_since(&fx.session, since).unwrap();
        assert_eq!(names(&recent), vec!["b5", "b4"]);
    }

    #[test]
    fn filter_by_tag() {
        let fx = Fixture::new();
        let list = listed(&fx, &["b3"]);
        for name in ["b1", "b2", "b3", "b4", "b5"] {
            let result = if name == "b4" { "SUCCESS" } else { "FAILURE" };
            fx.runner.respond(
                &format!("describe -ahlink tag -l baseline:{name}@/vobs/pvob"),
                [format!(
                    "    tag@1@/vobs/pvob -> \"tagtype=ci&tagid=main&result={result}\""
                )],
            );
        }
        let query = TagQuery::parse("result=SUCCESS").unwrap();
        let passed = list
            .filter(&fx.session, "ci", "main", |tag| tag.matches(&query))
            .unwrap();
        assert_eq!(names(&passed), vec!["b4"]);
        assert!(passed.context().is_some());
    }
}
