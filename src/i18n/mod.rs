//! Translation lookup seams
//!
//! The engine never loads translation files itself; it consumes a
//! [`TranslationProvider`] supplied by the embedder. [`LocaleSettings`]
//! bundles the provider with the default locale and is threaded explicitly
//! through the compiler and dispatcher, so there is no ambient global
//! locale state.

use std::collections::HashMap;
use std::sync::Arc;

/// Result of a single translation lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    /// The key resolved to display text.
    Found(String),
    /// The key is not known for the requested locale.
    Unknown,
}

impl Translation {
    /// Convert to an `Option`, discarding the unknown marker.
    pub fn ok(self) -> Option<String> {
        match self {
            Translation::Found(text) => Some(text),
            Translation::Unknown => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Translation::Found(_))
    }
}

/// Source of localized display text.
pub trait TranslationProvider: Send + Sync {
    /// Look up one key for one locale.
    fn get_single(&self, key: &str, locale: &str) -> Translation;

    /// All per-locale texts for a key, used to build platform display maps.
    fn platform_translations(&self, key: &str) -> HashMap<String, String>;
}

/// In-memory translation provider backed by nested maps.
///
/// Intended for tests and embedders without a file-based provider.
#[derive(Debug, Clone, Default)]
pub struct StaticTranslations {
    /// locale -> key -> text
    entries: HashMap<String, HashMap<String, String>>,
}

impl StaticTranslations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry, builder style.
    pub fn with(mut self, locale: &str, key: &str, text: &str) -> Self {
        self.insert(locale, key, text);
        self
    }

    /// Add one entry in place.
    pub fn insert(&mut self, locale: &str, key: &str, text: &str) {
        self.entries
            .entry(locale.to_string())
            .or_default()
            .insert(key.to_string(), text.to_string());
    }
}

impl TranslationProvider for StaticTranslations {
    fn get_single(&self, key: &str, locale: &str) -> Translation {
        match self.entries.get(locale).and_then(|m| m.get(key)) {
            Some(text) => Translation::Found(text.clone()),
            None => Translation::Unknown,
        }
    }

    fn platform_translations(&self, key: &str) -> HashMap<String, String> {
        self.entries
            .iter()
            .filter_map(|(locale, keys)| {
                keys.get(key).map(|text| (locale.clone(), text.clone()))
            })
            .collect()
    }
}

/// Locale context constructed once at startup and passed through the
/// compiler and dispatcher.
#[derive(Clone)]
pub struct LocaleSettings {
    provider: Arc<dyn TranslationProvider>,
    default_locale: String,
}

impl LocaleSettings {
    pub fn new(provider: Arc<dyn TranslationProvider>, default_locale: impl Into<String>) -> Self {
        Self {
            provider,
            default_locale: default_locale.into(),
        }
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn provider(&self) -> &dyn TranslationProvider {
        self.provider.as_ref()
    }

    /// Prefix a key with an optional namespace.
    pub fn namespaced(namespace: Option<&str>, key: &str) -> String {
        match namespace {
            Some(ns) => format!("{ns}.{key}"),
            None => key.to_string(),
        }
    }

    /// Look up a key at the default locale.
    pub fn single(&self, namespace: Option<&str>, key: &str) -> Translation {
        self.provider
            .get_single(&Self::namespaced(namespace, key), &self.default_locale)
    }

    /// All per-locale texts for a namespaced key.
    pub fn platform(&self, namespace: Option<&str>, key: &str) -> HashMap<String, String> {
        self.provider
            .platform_translations(&Self::namespaced(namespace, key))
    }

    /// Render a key for a caller locale, falling back to the default locale.
    ///
    /// Returns `None` when the key is unknown in both locales.
    pub fn render(&self, key: &str, locale: &str) -> Option<String> {
        if let Some(text) = self.provider.get_single(key, locale).ok() {
            return Some(text);
        }
        if locale != self.default_locale {
            return self.provider.get_single(key, &self.default_locale).ok();
        }
        None
    }
}
