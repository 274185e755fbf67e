//! The entry point: a command runner plus the entity registry.
//!
//! A [`Session`] is cheap to clone and safe to share between threads. All
//! clones see the same registry, so an entity loaded through one clone is
//! loaded for all of them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cool_cleartool::{CommandError, CommandOutput, CommandRunner};
use cool_core::{EntityKind, EntityRef};

use crate::baseline::Baseline;
use crate::component::Component;
use crate::error::Result;
use crate::project::Project;
use crate::registry::{Registered, Registry};
use crate::stream::Stream;

/// Default hyperlink type tags are stored under.
pub const DEFAULT_TAG_HLINK_TYPE: &str = "tag";

/// Session-wide settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Scope applied to user-supplied names without `@scope`.
    pub default_scope: Option<String>,
    /// Directory cleartool runs in.
    pub working_dir: Option<PathBuf>,
    /// Include child streams with posted deliveries in child listings.
    pub multisite_polling: bool,
    /// Hyperlink type tags are stored under.
    pub tag_hlink_type: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_scope: None,
            working_dir: None,
            multisite_polling: false,
            tag_hlink_type: DEFAULT_TAG_HLINK_TYPE.to_owned(),
        }
    }
}

struct SessionInner {
    runner: Box<dyn CommandRunner>,
    registry: Registry,
    settings: SessionSettings,
}

/// Shared handle to a runner and its entity registry.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.inner.settings)
            .field("cached", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session with default settings.
    pub fn new(runner: impl CommandRunner + 'static) -> Self {
        Self::with_settings(runner, SessionSettings::default())
    }

    pub fn with_settings(runner: impl CommandRunner + 'static, settings: SessionSettings) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                runner: Box::new(runner),
                registry: Registry::new(),
                settings,
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    // -- Lookup --------------------------------------------------------------

    /// Parses a user-supplied name as a reference of `kind`, applying the
    /// default scope.
    pub fn reference(&self, kind: EntityKind, input: &str) -> Result<EntityRef> {
        Ok(EntityRef::parse_as(
            kind,
            input,
            self.inner.settings.default_scope.as_deref(),
        )?)
    }

    /// The registry instance for `reference`, unloaded if new.
    pub fn identify<E: Registered>(&self, reference: &EntityRef) -> Result<Arc<E>> {
        self.inner.registry.identify(reference)
    }

    fn lookup<E: Registered>(&self, input: &str) -> Result<Arc<E>> {
        let reference = self.reference(E::KIND, input)?;
        self.identify(&reference)
    }

    pub fn project(&self, name: &str) -> Result<Arc<Project>> {
        self.lookup(name)
    }

    pub fn stream(&self, name: &str) -> Result<Arc<Stream>> {
        self.lookup(name)
    }

    pub fn baseline(&self, name: &str) -> Result<Arc<Baseline>> {
        self.lookup(name)
    }

    pub fn component(&self, name: &str) -> Result<Arc<Component>> {
        self.lookup(name)
    }

    // -- Commands ------------------------------------------------------------

    fn cwd(&self) -> Option<&Path> {
        self.inner.settings.working_dir.as_deref()
    }

    /// Runs a cleartool command, failing on a non-zero exit status.
    pub(crate) fn cleartool(&self, args: &[&str]) -> std::result::Result<CommandOutput, CommandError> {
        self.inner.runner.execute(args, self.cwd())
    }
}
