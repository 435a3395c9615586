//! Locale handling and backend message resolution
//!
//! The backend localizes its human-readable messages as a mapping of
//! language code to string (`{"ru": ..., "kk": ..., "en": ...}`), but some
//! error paths return a plain string instead. [`LocalizedText`] covers both
//! shapes; [`LocalizedText::resolve`] picks the right string for the active
//! display locale with a fixed fallback order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Display locales supported by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Russian (default and fallback locale)
    #[default]
    Ru,
    /// Kazakh
    Kk,
    /// English
    En,
}

impl Locale {
    /// Wire form of the locale, as sent in the `lang` query parameter
    /// and stored under the `lang` storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ru => "ru",
            Locale::Kk => "kk",
            Locale::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ru" => Ok(Locale::Ru),
            "kk" => Ok(Locale::Kk),
            "en" => Ok(Locale::En),
            other => Err(format!("unknown locale: {}", other)),
        }
    }
}

/// A backend-supplied message, either plain or keyed by language code.
///
/// `BTreeMap` keeps the "first available" fallback deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    /// Single string for every locale
    Plain(String),
    /// Per-locale mapping as emitted by the backend envelope
    PerLocale(BTreeMap<String, String>),
}

impl LocalizedText {
    /// Resolve the message for `locale`.
    ///
    /// Fallback order: requested locale, then Russian, then the first
    /// available language, then the empty string. The Russian fallback
    /// mirrors the backend, which always fills the `ru` slot.
    pub fn resolve(&self, locale: Locale) -> &str {
        match self {
            LocalizedText::Plain(text) => text,
            LocalizedText::PerLocale(map) => map
                .get(locale.as_str())
                .or_else(|| map.get(Locale::Ru.as_str()))
                .or_else(|| map.values().next())
                .map(String::as_str)
                .unwrap_or(""),
        }
    }
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resolve(Locale::Ru))
    }
}
