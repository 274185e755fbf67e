//! UCM projects.

use std::sync::Arc;

use cool_core::{EntityKind, EntityRef};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, UcmError, is_not_found};
use crate::loader::{describe, optional_ref_field, ref_list};
use crate::registry::{EntityMap, Registered, Registry};
use crate::session::Session;
use crate::stream::Stream;
use crate::traits::{CreatedFlag, Identifiable, Loadable, StateSlot};

pub(crate) const PROJECT_FORMAT: &str = "%[name]p}{%[istream]Xp}{%[master]p";
const PROJECT_FIELDS: usize = 3;

/// A UCM project: a set of streams around one integration stream.
#[derive(Debug)]
pub struct Project {
    reference: EntityRef,
    created: CreatedFlag,
    state: StateSlot<ProjectState>,
}

/// Loaded attributes of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectState {
    pub integration_stream: Option<EntityRef>,
    pub mastership: String,
}

impl Project {
    /// Every project in `scope`.
    pub fn list(session: &Session, scope: &str) -> Result<Vec<Arc<Project>>> {
        // Errors are reported against `project:*@scope`.
        let scope_ref = EntityRef::new(EntityKind::Project, "*", scope)?;
        let output = match session.cleartool(&["lsproject", "-s", "-invob", scope]) {
            Ok(output) => output,
            Err(e) if is_not_found(&e) => {
                debug!(scope, "no projects");
                return Ok(Vec::new());
            }
            Err(e) => return Err(UcmError::command(&scope_ref, "lsproject", e)),
        };
        let names: Vec<&str> = output
            .stdout_lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();
        ref_list(&scope_ref, "project", EntityKind::Project, names)?
            .iter()
            .map(|r| session.identify(r))
            .collect()
    }

    /// The project's integration stream, unloaded if not yet seen.
    pub fn integration_stream(&self, session: &Session) -> Result<Option<Arc<Stream>>> {
        self.state(session)?
            .integration_stream
            .as_ref()
            .map(|r| session.identify(r))
            .transpose()
    }

    /// Every stream in the project.
    pub fn streams(&self, session: &Session) -> Result<Vec<Arc<Stream>>> {
        let target = self.reference.to_string();
        let output = session
            .cleartool(&["lsstream", "-s", "-in", &target])
            .map_err(|e| UcmError::command(&self.reference, "lsstream", e))?;
        let names: Vec<&str> = output
            .stdout_lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();
        ref_list(&self.reference, "stream", EntityKind::Stream, names)?
            .iter()
            .map(|r| session.identify(r))
            .collect()
    }
}

impl Identifiable for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn reference(&self) -> &EntityRef {
        &self.reference
    }

    fn is_created(&self) -> bool {
        self.created.get()
    }
}

impl Loadable for Project {
    type State = ProjectState;

    fn slot(&self) -> &StateSlot<ProjectState> {
        &self.state
    }

    fn fetch(&self, session: &Session) -> Result<ProjectState> {
        let fields = describe(session, &self.reference, PROJECT_FORMAT, PROJECT_FIELDS)?;
        Ok(ProjectState {
            integration_stream: optional_ref_field(
                &self.reference,
                "istream",
                EntityKind::Stream,
                &fields[1],
            )?,
            mastership: fields[2].trim().to_owned(),
        })
    }

    fn state_mastership(state: &ProjectState) -> &str {
        &state.mastership
    }
}

impl Registered for Project {
    fn placeholder(reference: EntityRef) -> Self {
        Self {
            reference,
            created: CreatedFlag::default(),
            state: StateSlot::default(),
        }
    }

    fn entity_map(registry: &Registry) -> &EntityMap<Self> {
        &registry.projects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use pretty_assertions::assert_eq;

    #[test]
    fn integration_stream_is_identified_not_loaded() {
        let fx = Fixture::new();
        fx.project("proj", Some("proj_int"), "site1");
        let project = fx.session.project("proj").unwrap();
        let istream = project.integration_stream(&fx.session).unwrap().unwrap();
        assert_eq!(istream.reference().to_string(), "stream:proj_int@/vobs/pvob");
        assert!(!istream.is_loaded());
        assert!(Arc::ptr_eq(&istream, &fx.session.stream("proj_int").unwrap()));
    }

    #[test]
    fn load_is_idempotent() {
        let fx = Fixture::new();
        fx.project("proj", Some("proj_int"), "site1");
        let project = fx.session.project("proj").unwrap();
        let first = project.load(&fx.session).unwrap();
        let second = project.load(&fx.session).unwrap();
        assert_eq!(*first, *second);
    }

    #[test]
    fn reload_replaces_state() {
        let fx = Fixture::new();
        fx.project("proj", Some("proj_int"), "site1");
        let project = fx.session.project("proj").unwrap();
        assert_eq!(project.mastership(&fx.session).unwrap(), "site1");

        fx.project("proj", Some("proj_int"), "site2");
        project.load(&fx.session).unwrap();
        assert_eq!(project.mastership(&fx.session).unwrap(), "site2");
    }

    #[test]
    fn lists_projects_and_streams() {
        let fx = Fixture::new();
        fx.runner
            .respond("lsproject -s -invob /vobs/pvob", ["a", "b", ""]);
        fx.runner
            .respond("lsstream -s -in project:a@/vobs/pvob", ["a_int", "a_dev"]);

        let projects = Project::list(&fx.session, "/vobs/pvob").unwrap();
        let names: Vec<_> = projects.iter().map(|p| p.reference().name()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let streams = projects[0].streams(&fx.session).unwrap();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[1].reference().to_string(), "stream:a_dev@/vobs/pvob");
    }

    #[test]
    fn project_without_integration_stream() {
        let fx = Fixture::new();
        fx.project("bare", None, "site1");
        let project = fx.session.project("bare").unwrap();
        assert!(project.integration_stream(&fx.session).unwrap().is_none());
    }
}
