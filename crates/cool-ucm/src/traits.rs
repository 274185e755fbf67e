//! Capabilities shared by every UCM entity.
//!
//! [`Identifiable`] gives an entity its reference and creation flag.
//! [`Loadable`] adds the descriptor loader and the uniform auto-load rule:
//! accessors go through [`Loadable::state`] or [`Loadable::with_state`],
//! which load on first use and wrap a failure as
//! [`UcmError::EntityNotLoaded`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use cool_core::{EntityKind, EntityRef};
use tracing::debug;

use crate::error::{Result, UcmError};
use crate::session::Session;

// ---------------------------------------------------------------------------
// State slot
// ---------------------------------------------------------------------------

/// The loaded attributes of one entity.
///
/// A load builds a complete state off to the side and swaps it in, so
/// readers see either the previous state or the new one, never a mix.
#[derive(Debug)]
pub struct StateSlot<S> {
    inner: RwLock<Option<Arc<S>>>,
}

impl<S> Default for StateSlot<S> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }
}

impl<S> StateSlot<S> {
    /// The current state, if loaded.
    pub fn get(&self) -> Option<Arc<S>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the state wholesale.
    pub fn store(&self, state: S) -> Arc<S> {
        let state = Arc::new(state);
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&state));
        state
    }

    /// Applies `f` to a copy of the loaded state and stores the result.
    ///
    /// Does nothing when unloaded; the next load reads the new value.
    pub fn update(&self, f: impl FnOnce(&mut S))
    where
        S: Clone,
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = guard.as_ref() {
            let mut next = S::clone(current);
            f(&mut next);
            *guard = Some(Arc::new(next));
        }
    }

    /// Drops the state so the next access loads again.
    pub fn invalidate(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// A value computed on demand and cached until invalidated.
#[derive(Debug)]
pub struct Cached<T> {
    inner: RwLock<Option<T>>,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }
}

impl<T: Clone> Cached<T> {
    pub fn get(&self) -> Option<T> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, value: T) -> T {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(value.clone());
        value
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The cached value, or the result of `fetch` (which is then cached).
    pub fn get_or_try(&self, fetch: impl FnOnce() -> Result<T>) -> Result<T> {
        match self.get() {
            Some(value) => Ok(value),
            None => fetch().map(|value| self.set(value)),
        }
    }
}

/// Marks whether an entity was created through this session.
#[derive(Debug, Default)]
pub struct CreatedFlag(AtomicBool);

impl CreatedFlag {
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// An entity addressed by a canonical reference.
pub trait Identifiable {
    /// The kind every reference of this type carries.
    const KIND: EntityKind;

    fn reference(&self) -> &EntityRef;

    /// Returns `true` if this session created the entity in the store.
    fn is_created(&self) -> bool;
}

/// An entity whose attributes come from one descriptor query.
pub trait Loadable: Identifiable {
    type State: Send + Sync;

    fn slot(&self) -> &StateSlot<Self::State>;

    /// Runs the descriptor query and parses it, without touching the slot.
    fn fetch(&self, session: &Session) -> Result<Self::State>;

    /// The mastership replica recorded in a loaded state.
    fn state_mastership(state: &Self::State) -> &str;

    /// Loads (or reloads) the entity, replacing any previous state.
    ///
    /// On failure the previous state, if any, is kept.
    fn load(&self, session: &Session) -> Result<Arc<Self::State>> {
        let state = self.fetch(session)?;
        debug!(reference = %self.reference(), "loaded");
        Ok(self.slot().store(state))
    }

    fn is_loaded(&self) -> bool {
        self.slot().is_loaded()
    }

    /// The loaded state, loading it first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::EntityNotLoaded`] wrapping the load failure.
    fn state(&self, session: &Session) -> Result<Arc<Self::State>> {
        if let Some(state) = self.slot().get() {
            return Ok(state);
        }
        self.load(session)
            .map_err(|source| UcmError::not_loaded(self.reference(), source))
    }

    /// Applies `f` to the loaded state, loading it first if needed.
    fn with_state<T>(&self, session: &Session, f: impl FnOnce(&Self::State) -> T) -> Result<T> {
        Ok(f(&*self.state(session)?))
    }

    fn ensure_loaded(&self, session: &Session) -> Result<()> {
        self.state(session).map(|_| ())
    }

    /// The replica that masters this entity.
    fn mastership(&self, session: &Session) -> Result<String> {
        Ok(Self::state_mastership(&*self.state(session)?).to_owned())
    }
}
