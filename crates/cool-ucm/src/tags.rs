//! Key/value tags attached to entities.
//!
//! A tag is stored as a text hyperlink on the entity. The hyperlink text is
//! the encoded [`TagText`]; its `tagtype`/`tagid` pair tells tags on the
//! same entity apart.

use std::sync::OnceLock;

use cool_cleartool::CommandError;
use cool_core::{EntityRef, TagEntries, TagText};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, UcmError};
use crate::session::Session;

fn hlink_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*(\S+@\d+@\S+)\s+->\s+"(.*)"\s*$"#).expect("valid regex"))
}

fn created_hlink_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"Created hyperlink "([^"]+)""#).expect("valid regex"))
}

/// Every tag stored on `entity`, with the hyperlink holding it.
fn stored_tags(session: &Session, entity: &EntityRef) -> Result<Vec<(String, TagText)>> {
    let hltype = &session.settings().tag_hlink_type;
    let target = entity.to_string();
    let output = session
        .cleartool(&["describe", "-ahlink", hltype, "-l", &target])
        .map_err(|e| UcmError::load(entity, e))?;

    let mut tags = Vec::new();
    for line in &output.stdout_lines {
        let Some(caps) = hlink_line_re().captures(line) else {
            continue;
        };
        match TagText::decode(&caps[2]) {
            Some(text) => tags.push((caps[1].to_owned(), text)),
            None => debug!(%entity, hlink = &caps[1], "skipping foreign hyperlink"),
        }
    }
    Ok(tags)
}

/// The creation serial of a `type@serial@vob` hyperlink id.
fn hlink_serial(hlink: &str) -> u64 {
    hlink
        .split('@')
        .nth(1)
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// One tag on one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    entity: EntityRef,
    tag_type: String,
    tag_id: String,
    entries: TagEntries,
    /// Hyperlink holding the stored tag, `None` if never persisted.
    hlink: Option<String>,
    created: bool,
}

impl Tag {
    /// A new, unpersisted tag.
    pub fn new(entity: EntityRef, tag_type: &str, tag_id: &str) -> Self {
        Self {
            entity,
            tag_type: tag_type.to_owned(),
            tag_id: tag_id.to_owned(),
            entries: TagEntries::new(),
            hlink: None,
            created: false,
        }
    }

    /// Reads the tag of the given type and id from `entity`.
    ///
    /// Returns a new, empty tag if the entity has none. If several
    /// hyperlinks hold the same tag, the most recently created one wins.
    pub fn get(session: &Session, entity: &EntityRef, tag_type: &str, tag_id: &str) -> Result<Self> {
        let mut matching: Vec<(String, TagText)> = stored_tags(session, entity)?
            .into_iter()
            .filter(|(_, text)| text.tag_type == tag_type && text.tag_id == tag_id)
            .collect();
        if matching.len() > 1 {
            warn!(%entity, tag_type, tag_id, count = matching.len(), "tag stored more than once");
        }
        matching.sort_by_key(|(hlink, _)| hlink_serial(hlink));

        Ok(match matching.pop() {
            Some((hlink, text)) => Self {
                entity: entity.clone(),
                tag_type: text.tag_type,
                tag_id: text.tag_id,
                entries: text.entries,
                hlink: Some(hlink),
                created: false,
            },
            None => Self::new(entity.clone(), tag_type, tag_id),
        })
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn tag_type(&self) -> &str {
        &self.tag_type
    }

    pub fn tag_id(&self) -> &str {
        &self.tag_id
    }

    pub fn entries(&self) -> &TagEntries {
        &self.entries
    }

    pub fn get_entry(&self, key: &str) -> Option<&str> {
        self.entries.get(key)
    }

    /// Sets an entry locally; nothing is written until [`Tag::persist`].
    pub fn set_entry(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key, value)?;
        Ok(())
    }

    pub fn remove_entry(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Returns `true` if the tag is stored in the backing store.
    pub fn is_persisted(&self) -> bool {
        self.hlink.is_some()
    }

    /// Returns `true` if the last [`Tag::persist`] created the tag rather
    /// than replacing an existing one.
    pub fn created(&self) -> bool {
        self.created
    }

    /// Writes the tag, replacing any stored version.
    ///
    /// The new hyperlink is written before the old one is removed, so a
    /// failed write leaves the stored tag and [`Tag::is_persisted`] as they
    /// were.
    ///
    /// # Errors
    ///
    /// - [`UcmError::TagPersistFailed`] if creating the new hyperlink or
    ///   removing the old one fails. In the latter case the tag already
    ///   refers to the new hyperlink.
    /// - [`UcmError::MalformedResponse`] if the new hyperlink cannot be
    ///   found after writing it.
    pub fn persist(&mut self, session: &Session) -> Result<()> {
        let previous = self.hlink.clone();
        let text = TagText {
            tag_type: self.tag_type.clone(),
            tag_id: self.tag_id.clone(),
            entries: self.entries.clone(),
        }
        .encode();
        let hltype = &session.settings().tag_hlink_type;
        let target = self.entity.to_string();

        let output = session
            .cleartool(&["mkhlink", "-ttext", &text, hltype, &target])
            .map_err(|source| self.persist_failed(source))?;

        let stdout = output.stdout();
        let written = match created_hlink_re().captures(&stdout) {
            Some(caps) => caps[1].to_owned(),
            None => {
                debug!(entity = %self.entity, "hyperlink id not in mkhlink output, listing");
                self.find_written(session, &text, previous.as_deref())?
                    .ok_or_else(|| UcmError::malformed_field(&self.entity, "hyperlink", &stdout))?
            }
        };
        self.hlink = Some(written);
        self.created = previous.is_none();

        if let Some(old) = previous {
            if let Err(source) = session.cleartool(&["rmhlink", &old]) {
                warn!(entity = %self.entity, hlink = %old, "old tag hyperlink left behind");
                return Err(self.persist_failed(source));
            }
        }

        info!(entity = %self.entity, tag_type = %self.tag_type, tag_id = %self.tag_id, created = self.created, "tag persisted");
        Ok(())
    }

    fn persist_failed(&self, source: CommandError) -> UcmError {
        UcmError::TagPersistFailed {
            reference: self.entity.clone(),
            source,
        }
    }

    /// The hyperlink holding `text`, other than `previous`.
    fn find_written(&self, session: &Session, text: &str, previous: Option<&str>) -> Result<Option<String>> {
        let written = TagText::decode(text);
        Ok(stored_tags(session, &self.entity)?
            .into_iter()
            .filter(|(hlink, stored)| Some(hlink.as_str()) != previous && Some(stored) == written.as_ref())
            .max_by_key(|(hlink, _)| hlink_serial(hlink))
            .map(|(hlink, _)| hlink))
    }

    /// Returns `true` if the tag satisfies `query`.
    pub fn matches(&self, query: &TagQuery) -> bool {
        query.matches(&self.entries)
    }
}

/// A conjunction of `key = value` conditions on tag entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    conditions: TagEntries,
}

impl TagQuery {
    /// Parses `key1=value1&key2=value2`; every pair must match.
    pub fn parse(input: &str) -> Result<Self> {
        Ok(Self {
            conditions: TagEntries::parse(input)?,
        })
    }

    pub fn matches(&self, entries: &TagEntries) -> bool {
        self.conditions
            .iter()
            .all(|(key, value)| entries.get(key) == Some(value))
    }
}
