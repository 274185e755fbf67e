//! UCM components.

use cool_core::descriptor::optional_field;
use cool_core::{EntityKind, EntityRef};
use serde::Serialize;

use crate::error::Result;
use crate::loader::describe;
use crate::registry::{EntityMap, Registered, Registry};
use crate::session::Session;
use crate::traits::{CreatedFlag, Identifiable, Loadable, StateSlot};

pub(crate) const COMPONENT_FORMAT: &str = "%[name]p}{%[root_dir]p}{%[master]p";
const COMPONENT_FIELDS: usize = 3;

/// A versioned set of elements baselines are taken of.
#[derive(Debug)]
pub struct Component {
    reference: EntityRef,
    created: CreatedFlag,
    state: StateSlot<ComponentState>,
}

/// Loaded attributes of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentState {
    /// Root directory; rootless components have none.
    pub root_dir: Option<String>,
    pub mastership: String,
}

impl Component {
    pub fn root_dir(&self, session: &Session) -> Result<Option<String>> {
        self.with_state(session, |s| s.root_dir.clone())
    }
}

impl Identifiable for Component {
    const KIND: EntityKind = EntityKind::Component;

    fn reference(&self) -> &EntityRef {
        &self.reference
    }

    fn is_created(&self) -> bool {
        self.created.get()
    }
}

impl Loadable for Component {
    type State = ComponentState;

    fn slot(&self) -> &StateSlot<ComponentState> {
        &self.state
    }

    fn fetch(&self, session: &Session) -> Result<ComponentState> {
        let fields = describe(session, &self.reference, COMPONENT_FORMAT, COMPONENT_FIELDS)?;
        Ok(ComponentState {
            root_dir: optional_field(&fields[1]).map(str::to_owned),
            mastership: fields[2].trim().to_owned(),
        })
    }

    fn state_mastership(state: &ComponentState) -> &str {
        &state.mastership
    }
}

impl Registered for Component {
    fn placeholder(reference: EntityRef) -> Self {
        Self {
            reference,
            created: CreatedFlag::default(),
            state: StateSlot::default(),
        }
    }

    fn entity_map(registry: &Registry) -> &EntityMap<Self> {
        &registry.components
    }
}
