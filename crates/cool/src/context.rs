//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds what a command handler needs: the merged
//! configuration, global flags, and the UCM session built from them.

use std::str::FromStr;

use anyhow::{Context, Result};
use cool_cleartool::Cleartool;
use cool_config::config::{CoolConfig, load_config};
use cool_config::cool_dir::find_cool_dir;
use cool_core::{EntityKind, EntityRef, ParseRefError};
use cool_ucm::{Session, SessionSettings, UcmError};
use tracing::debug;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Configuration after file, environment and flag overrides.
    pub config: CoolConfig,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,

    session: Session,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    ///
    /// Configuration priority: flags > `COOL_*` env > `.cool/config.yaml` >
    /// defaults.
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot determine current directory")?;
        let cool_dir = find_cool_dir(&cwd);
        let mut config = load_config(cool_dir.as_deref()).context("failed to load configuration")?;
        apply_overrides(&mut config, global);
        config.validate()?;

        let session = build_session(&config);
        debug!(
            cool_dir = ?cool_dir,
            pvob = ?config.pvob,
            cleartool = %config.cleartool.binary,
            "runtime context ready"
        );
        Ok(Self {
            config,
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Parses `kind:name[@scope]`, applying the default scope.
    pub fn entity_ref(&self, input: &str) -> Result<EntityRef, UcmError> {
        let (prefix, _) = input
            .split_once(':')
            .ok_or_else(|| ParseRefError::MissingKind(input.to_owned()))?;
        let kind = EntityKind::from_str(prefix)
            .map_err(|_| ParseRefError::UnknownKind(prefix.to_owned()))?;
        self.session.reference(kind, input)
    }
}

fn apply_overrides(config: &mut CoolConfig, global: &GlobalArgs) {
    if let Some(pvob) = &global.pvob {
        config.pvob = Some(pvob.clone());
    }
    if let Some(binary) = &global.cleartool {
        config.cleartool.binary = binary.clone();
    }
    if let Some(timeout) = global.timeout {
        config.cleartool.timeout_secs = Some(timeout);
    }
}

fn build_session(config: &CoolConfig) -> Session {
    let runner = Cleartool::new()
        .with_binary(&config.cleartool.binary)
        .with_timeout(config.timeout());
    let settings = SessionSettings {
        default_scope: config.pvob.clone(),
        working_dir: config.cleartool.working_dir.clone(),
        multisite_polling: config.multisite.polling,
        tag_hlink_type: config.tags.hlink_type.clone(),
    };
    Session::with_settings(runner, settings)
}
