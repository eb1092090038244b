//! Session answer cache.
//!
//! One value per `(field kind, normalized question)` key, last write wins.
//! The cache lives for one session and is owned by it — persistence across
//! runs belongs to the caller.

use std::collections::HashMap;

use tracing::debug;

use super::utils::normalize_text;

/// The eight handling strategies a field group can classify into. Doubles
/// as the answer-cache key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Textarea,
    Radio,
    Checkbox,
    Dropdown,
    Typeahead,
    Date,
    FileUpload,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Dropdown => "dropdown",
            FieldKind::Typeahead => "typeahead",
            FieldKind::Date => "date",
            FieldKind::FileUpload => "file_upload",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
pub struct AnswerCache {
    entries: HashMap<String, String>,
}

impl AnswerCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: FieldKind, question: &str) -> String {
        format!("{}:{}", kind.as_str(), normalize_text(question))
    }

    pub fn insert(&mut self, kind: FieldKind, question: &str, answer: impl Into<String>) {
        let key = Self::key(kind, question);
        let answer = answer.into();
        debug!("caching answer for '{key}'");
        self.entries.insert(key, answer);
    }

    /// Exact lookup by normalized key, else a substring match against cached
    /// questions of the same kind (either direction).
    pub fn get(&self, kind: FieldKind, question: &str) -> Option<&str> {
        let key = Self::key(kind, question);
        if let Some(hit) = self.entries.get(&key) {
            return Some(hit.as_str());
        }
        let prefix = format!("{}:", kind.as_str());
        let wanted = normalize_text(question);
        if wanted.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .find(|(k, _)| {
                let cached = &k[prefix.len()..];
                !cached.is_empty() && (cached.contains(&wanted) || wanted.contains(cached))
            })
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut cache = AnswerCache::new();
        cache.insert(FieldKind::Text, "Years of experience?", "3");
        cache.insert(FieldKind::Text, "Years of experience?", "5");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(FieldKind::Text, "Years of experience?"), Some("5"));
    }

    #[test]
    fn test_key_normalization_merges_variants() {
        let mut cache = AnswerCache::new();
        cache.insert(FieldKind::Text, "  YEARS of   Experience? ", "4");
        assert_eq!(cache.get(FieldKind::Text, "years of experience?"), Some("4"));
    }

    #[test]
    fn test_substring_fallback_same_kind_only() {
        let mut cache = AnswerCache::new();
        cache.insert(FieldKind::Dropdown, "Country of residence", "Germany");
        assert_eq!(cache.get(FieldKind::Dropdown, "Country"), Some("Germany"));
        assert_eq!(cache.get(FieldKind::Text, "Country"), None);
    }

    #[test]
    fn test_miss_returns_none() {
        let cache = AnswerCache::new();
        assert_eq!(cache.get(FieldKind::Radio, "Anything"), None);
    }
}
