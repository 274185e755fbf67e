//! Tag key/value entries and their text encoding.
//!
//! Tags are flat string maps. On the command line and in the backing store
//! they are written as `key1=value1&key2=value2`; the stored form adds the
//! reserved `tagtype` and `tagid` keys that discriminate tags on the same
//! entity.

use std::collections::BTreeMap;
use std::fmt;

/// Reserved key holding the tag type.
pub const TAG_TYPE_KEY: &str = "tagtype";
/// Reserved key holding the tag id.
pub const TAG_ID_KEY: &str = "tagid";

/// An unordered set of tag key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct TagEntries(BTreeMap<String, String>);

impl TagEntries {
    /// Creates an empty set of entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `key1=value1&key2=value2`. Keys and values are trimmed.
    ///
    /// An empty (or blank) input yields no entries.
    pub fn parse(input: &str) -> Result<Self, TagParseError> {
        let mut entries = Self::new();
        if input.trim().is_empty() {
            return Ok(entries);
        }
        for pair in input.split('&') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| TagParseError::MissingSeparator(pair.to_owned()))?;
            entries.insert(key.trim(), value.trim())?;
        }
        Ok(entries)
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: &str, value: &str) -> Result<(), TagParseError> {
        validate_key(key)?;
        validate_value(value)?;
        self.0.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for TagEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in self.iter() {
            if !first {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for TagEntries {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )
    }
}

/// The stored text of one tag: discriminator plus entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagText {
    pub tag_type: String,
    pub tag_id: String,
    pub entries: TagEntries,
}

impl TagText {
    /// Encodes the tag as stored text.
    pub fn encode(&self) -> String {
        let mut out = format!(
            "{TAG_TYPE_KEY}={}&{TAG_ID_KEY}={}",
            self.tag_type, self.tag_id
        );
        if !self.entries.is_empty() {
            out.push('&');
            out.push_str(&self.entries.to_string());
        }
        out
    }

    /// Decodes stored text, returning `None` if the discriminator keys are
    /// missing (the hyperlink is not a tag written by this library).
    pub fn decode(text: &str) -> Option<Self> {
        let mut tag_type = None;
        let mut tag_id = None;
        let mut entries = TagEntries::new();

        for pair in text.split('&') {
            let (key, value) = pair.split_once('=')?;
            let (key, value) = (key.trim(), value.trim());
            match key {
                TAG_TYPE_KEY => tag_type = Some(value.to_owned()),
                TAG_ID_KEY => tag_id = Some(value.to_owned()),
                _ => {
                    entries.0.insert(key.to_owned(), value.to_owned());
                }
            }
        }

        Some(Self {
            tag_type: tag_type?,
            tag_id: tag_id?,
            entries,
        })
    }
}

fn validate_key(key: &str) -> Result<(), TagParseError> {
    if key.is_empty() {
        return Err(TagParseError::EmptyKey);
    }
    if key == TAG_TYPE_KEY || key == TAG_ID_KEY {
        return Err(TagParseError::ReservedKey(key.to_owned()));
    }
    if key.contains(['&', '=', '"']) || key.trim() != key {
        return Err(TagParseError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

// Stored text is trimmed on decode, so padding would not survive a round trip.
fn validate_value(value: &str) -> Result<(), TagParseError> {
    if value.contains(['&', '"', '\n']) || value.trim() != value {
        return Err(TagParseError::InvalidValue(value.to_owned()));
    }
    Ok(())
}

/// Errors returned when parsing or editing tag entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagParseError {
    #[error("tag entry {0:?} is not of the form key=value")]
    MissingSeparator(String),

    #[error("tag key must not be empty")]
    EmptyKey,

    #[error("tag key {0:?} is reserved")]
    ReservedKey(String),

    #[error("tag key {0:?} contains a reserved character or surrounding whitespace")]
    InvalidKey(String),

    #[error("tag value {0:?} contains a reserved character or surrounding whitespace")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_pairs() {
        let e = TagEntries::parse("buildnumber = 42&result=SUCCESS").unwrap();
        assert_eq!(e.len(), 2);
        assert_eq!(e.get("buildnumber"), Some("42"));
        assert_eq!(e.get("result"), Some("SUCCESS"));
    }

    #[test]
    fn parse_empty_input() {
        assert!(TagEntries::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_bad_pairs() {
        assert_eq!(
            TagEntries::parse("a=1&oops").unwrap_err(),
            TagParseError::MissingSeparator("oops".into())
        );
        assert_eq!(TagEntries::parse("=1").unwrap_err(), TagParseError::EmptyKey);
        assert!(matches!(
            TagEntries::parse("tagid=1").unwrap_err(),
            TagParseError::ReservedKey(_)
        ));
    }

    #[test]
    fn order_is_irrelevant() {
        let a = TagEntries::parse("a=1&b=2").unwrap();
        let b = TagEntries::parse("b=2&a=1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "a=1&b=2");
    }

    #[test]
    fn stored_text_round_trip() {
        let text = TagText {
            tag_type: "hudson".into(),
            tag_id: "job-7".into(),
            entries: TagEntries::parse("a=1&b=2").unwrap(),
        };
        let encoded = text.encode();
        assert_eq!(encoded, "tagtype=hudson&tagid=job-7&a=1&b=2");
        assert_eq!(TagText::decode(&encoded).unwrap(), text);
    }

    #[test]
    fn padded_values_are_rejected_on_insert() {
        let mut e = TagEntries::new();
        assert_eq!(
            e.insert("a", " 1 ").unwrap_err(),
            TagParseError::InvalidValue(" 1 ".into())
        );
        assert_eq!(e.insert(" a", "1").unwrap_err(), TagParseError::InvalidKey(" a".into()));
        assert!(e.is_empty());

        // Parsing trims first, so the same input is accepted there.
        assert_eq!(TagEntries::parse("a= 1 ").unwrap().get("a"), Some("1"));
    }

    #[test]
    fn inner_whitespace_survives_storage() {
        let mut entries = TagEntries::new();
        entries.insert("note", "two words").unwrap();
        let text = TagText {
            tag_type: "ci".into(),
            tag_id: "main".into(),
            entries,
        };
        assert_eq!(TagText::decode(&text.encode()).unwrap(), text);
    }

    #[test]
    fn decode_requires_discriminator() {
        assert!(TagText::decode("a=1&b=2").is_none());
        assert!(TagText::decode("tagtype=x").is_none());
        let bare = TagText::decode("tagtype=x&tagid=y").unwrap();
        assert!(bare.entries.is_empty());
    }
}
