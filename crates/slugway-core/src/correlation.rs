use crate::error::CoreError;
use crate::page::PageId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::str::FromStr;

/// Capability prefix written in front of every serialized id.
pub const DEFAULT_CAPABILITIES: &str = "0400";

/// An opaque tag grouping related writes for later auditing.
///
/// The string form is `<capabilities>$<subject>/<aspect>/<aspect>`, where the
/// subject and the aspects are optional. Subject and aspects are
/// percent-encoded, so a `/` inside either survives a round trip.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationId {
    capabilities: String,
    subject: Option<String>,
    aspects: Vec<String>,
}

impl CorrelationId {
    /// Creates an id without subject or aspects.
    pub fn new() -> Self {
        Self {
            capabilities: DEFAULT_CAPABILITIES.to_string(),
            subject: None,
            aspects: Vec::new(),
        }
    }

    pub fn for_subject(subject: impl Into<String>) -> Self {
        Self::new().with_subject(subject)
    }

    /// The subject used for page writes when the caller supplied none.
    pub fn page_subject(page_id: PageId) -> String {
        format!("{:x}", Sha256::digest(format!("pages:{page_id}").as_bytes()))
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Returns a copy carrying `aspects` in place of the current ones.
    pub fn with_aspects<I, S>(&self, aspects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capabilities: self.capabilities.clone(),
            subject: self.subject.clone(),
            aspects: aspects.into_iter().map(Into::into).collect(),
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn aspects(&self) -> &[String] {
        &self.aspects
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}$", self.capabilities)?;
        if let Some(subject) = &self.subject {
            f.write_str(&urlencoding::encode(subject))?;
        }
        for aspect in &self.aspects {
            write!(f, "/{}", urlencoding::encode(aspect))?;
        }
        Ok(())
    }
}

impl FromStr for CorrelationId {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (capabilities, rest) = value
            .split_once('$')
            .ok_or_else(|| CoreError::InvalidCorrelationId(format!("missing '$': '{value}'")))?;

        if capabilities.is_empty() || !capabilities.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidCorrelationId(format!(
                "capabilities must be hex digits: '{value}'"
            )));
        }

        let mut parts = rest.split('/');
        let subject = parts
            .next()
            .filter(|s| !s.is_empty())
            .map(|s| decode_part(s, value))
            .transpose()?;
        let aspects = parts
            .map(|aspect| {
                if aspect.is_empty() {
                    return Err(CoreError::InvalidCorrelationId(format!(
                        "empty aspect: '{value}'"
                    )));
                }
                decode_part(aspect, value)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            capabilities: capabilities.to_string(),
            subject,
            aspects,
        })
    }
}

fn decode_part(part: &str, value: &str) -> Result<String, CoreError> {
    urlencoding::decode(part)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| CoreError::InvalidCorrelationId(format!("'{value}': {e}")))
}

impl Serialize for CorrelationId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CorrelationId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_subject_and_aspects() {
        let id = CorrelationId::for_subject("abc").with_aspects(["slugway", "slug"]);
        assert_eq!(id.to_string(), "0400$abc/slugway/slug");
    }

    #[test]
    fn display_without_subject() {
        assert_eq!(CorrelationId::new().to_string(), "0400$");
    }

    #[test]
    fn parse_round_trips_string_form() {
        let raw = "0400$61dbc6a2/slugway/redirect";
        let id: CorrelationId = raw.parse().unwrap();
        assert_eq!(id.subject(), Some("61dbc6a2"));
        assert_eq!(id.aspects(), ["slugway", "redirect"]);
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn slash_in_subject_round_trips() {
        let id = CorrelationId::for_subject("a/b").with_aspects(["slugway", "x/y"]);
        assert_eq!(id.to_string(), "0400$a%2Fb/slugway/x%2Fy");

        let back: CorrelationId = id.to_string().parse().unwrap();
        assert_eq!(back.subject(), Some("a/b"));
        assert_eq!(back.aspects(), ["slugway", "x/y"]);
        assert_eq!(back, id);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!("no-dollar".parse::<CorrelationId>().is_err());
        assert!("zz$abc".parse::<CorrelationId>().is_err());
        assert!("0400$abc//x".parse::<CorrelationId>().is_err());
    }

    #[test]
    fn with_aspects_replaces_existing_aspects() {
        let base = CorrelationId::for_subject("s").with_aspects(["a"]);
        let derived = base.with_aspects(["b", "c"]);
        assert_eq!(derived.to_string(), "0400$s/b/c");
        assert_eq!(base.to_string(), "0400$s/a");
    }

    #[test]
    fn page_subject_is_stable_sha256() {
        let subject = CorrelationId::page_subject(42);
        assert_eq!(subject.len(), 64);
        assert_eq!(subject, CorrelationId::page_subject(42));
        assert_ne!(subject, CorrelationId::page_subject(43));
    }

    #[test]
    fn serializes_as_string() {
        let id = CorrelationId::for_subject("s").with_aspects(["x"]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0400$s/x\"");
        let back: CorrelationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
