//! Identity map: one in-memory instance per canonical reference.
//!
//! Lookups never talk to the backing store. The first lookup of a reference
//! creates an unloaded placeholder; every later lookup returns the same
//! `Arc` until the reference is forgotten.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use cool_core::{EntityRef, ParseRefError};
use tracing::trace;

use crate::baseline::Baseline;
use crate::component::Component;
use crate::error::Result;
use crate::project::Project;
use crate::stream::Stream;
use crate::traits::Identifiable;

/// An entity type the registry can hold.
pub trait Registered: Identifiable + Send + Sync + Sized + 'static {
    /// A new, unloaded instance for `reference`.
    fn placeholder(reference: EntityRef) -> Self;

    /// The map holding instances of this type.
    fn entity_map(registry: &Registry) -> &EntityMap<Self>;
}

/// Instances of one entity type, keyed by reference.
#[derive(Debug)]
pub struct EntityMap<E> {
    entries: RwLock<HashMap<EntityRef, Arc<E>>>,
}

impl<E> Default for EntityMap<E> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Registered> EntityMap<E> {
    fn identify(&self, reference: &EntityRef) -> Arc<E> {
        if let Some(entity) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reference)
        {
            return Arc::clone(entity);
        }

        // Another thread may have inserted between the two locks; the entry
        // API keeps whichever instance got there first.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(reference.clone()).or_insert_with(|| {
            trace!(%reference, "new placeholder");
            Arc::new(E::placeholder(reference.clone()))
        }))
    }

    fn forget(&self, reference: &EntityRef) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(reference)
            .is_some()
    }

    fn contains(&self, reference: &EntityRef) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(reference)
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Per-session cache of every entity seen so far.
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) projects: EntityMap<Project>,
    pub(crate) streams: EntityMap<Stream>,
    pub(crate) baselines: EntityMap<Baseline>,
    pub(crate) components: EntityMap<Component>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the instance for `reference`, creating a placeholder on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`crate::UcmError::InvalidReference`] if the reference is of
    /// another kind than `E`.
    pub fn identify<E: Registered>(&self, reference: &EntityRef) -> Result<Arc<E>> {
        if reference.kind() != E::KIND {
            return Err(ParseRefError::KindMismatch {
                expected: E::KIND,
                input: reference.to_string(),
            }
            .into());
        }
        Ok(E::entity_map(self).identify(reference))
    }

    /// Drops the cached instance so the next lookup starts fresh. Returns
    /// `true` if there was one.
    pub fn forget<E: Registered>(&self, reference: &EntityRef) -> bool {
        E::entity_map(self).forget(reference)
    }

    pub fn contains<E: Registered>(&self, reference: &EntityRef) -> bool {
        E::entity_map(self).contains(reference)
    }

    /// Total number of cached instances across all kinds.
    pub fn len(&self) -> usize {
        self.projects.len() + self.streams.len() + self.baselines.len() + self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Loadable;
    use cool_core::EntityKind;
    use pretty_assertions::assert_eq;

    fn stream_ref(name: &str) -> EntityRef {
        EntityRef::new(EntityKind::Stream, name, "/vobs/pvob").unwrap()
    }

    #[test]
    fn identify_returns_same_instance() {
        let registry = Registry::new();
        let a: Arc<Stream> = registry.identify(&stream_ref("dev")).unwrap();
        let b: Arc<Stream> = registry.identify(&stream_ref("dev")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.is_loaded());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_references_are_distinct_instances() {
        let registry = Registry::new();
        let a: Arc<Stream> = registry.identify(&stream_ref("a")).unwrap();
        let b: Arc<Stream> = registry.identify(&stream_ref("b")).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn identify_rejects_wrong_kind() {
        let registry = Registry::new();
        let err = registry.identify::<Project>(&stream_ref("dev")).unwrap_err();
        assert_eq!(err.kind(), "InvalidReference");
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_identify_yields_one_instance() {
        let registry = Registry::new();
        let reference = stream_ref("shared");
        let found: Vec<Arc<Stream>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.identify::<Stream>(&reference).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(found.iter().all(|s| Arc::ptr_eq(s, &found[0])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn forget_yields_fresh_instance() {
        let registry = Registry::new();
        let first: Arc<Stream> = registry.identify(&stream_ref("dev")).unwrap();
        assert!(registry.forget::<Stream>(&stream_ref("dev")));
        assert!(!registry.contains::<Stream>(&stream_ref("dev")));
        let second: Arc<Stream> = registry.identify(&stream_ref("dev")).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!registry.forget::<Stream>(&stream_ref("other")));
    }
}
