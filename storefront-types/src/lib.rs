#![deny(clippy::unwrap_used)]

use derive_more::{Deref, Display};
use itertools::Itertools;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod attribute;
pub mod category;
pub mod filter;
pub mod listing;
pub mod product;

pub const DEFAULT_LOCALE: &str = "en";

/// Active display language. Passed explicitly into every projection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Display, Deref)]
#[serde(transparent)]
pub struct Locale(pub String);

impl Locale {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        let s = s.as_ref().trim().to_lowercase();
        if s.is_empty() {
            Self::default()
        } else {
            Self(s)
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self(DEFAULT_LOCALE.to_string())
    }
}

/// Either a single string or a map of locale code to translation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Translated(BTreeMap<String, String>),
}

impl LocalizedText {
    pub fn get(&self, locale: &Locale) -> Option<&str> {
        match self {
            Self::Plain(s) => Some(s).filter(|s| !s.trim().is_empty()),
            Self::Translated(map) => map
                .get(locale.as_str())
                .filter(|s| !s.trim().is_empty())
                .or_else(|| map.get(DEFAULT_LOCALE).filter(|s| !s.trim().is_empty()))
                .or_else(|| map.values().find(|s| !s.trim().is_empty())),
        }
        .map(String::as_str)
    }
}

impl From<&str> for LocalizedText {
    fn from(s: &str) -> Self {
        Self::Plain(s.to_string())
    }
}

pub fn localized<'a>(text: Option<&'a LocalizedText>, locale: &Locale, fallback: &'a str) -> &'a str {
    text.and_then(|t| t.get(locale)).unwrap_or(fallback)
}

/// Strips leading, trailing and repeated slashes: `"/a//b/"` becomes `"a/b"`.
pub fn normalize_path<S: AsRef<str>>(path: S) -> String {
    path.as_ref()
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .join("/")
}

/// Path of a child category. Children of the root carry their bare slug.
pub fn child_path(parent: &str, slug: &str) -> String {
    let slug = slug.trim_matches('/');
    if parent.is_empty() {
        slug.to_string()
    } else {
        format!("{parent}/{slug}")
    }
}

pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => T::deserialize(s.into_deserializer()).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_paths() {
        assert_eq!(normalize_path("/electronics//phones/"), "electronics/phones");
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("///"), "");
        assert_eq!(normalize_path("books"), "books");
    }

    #[test]
    fn builds_child_paths() {
        assert_eq!(child_path("", "books"), "books");
        assert_eq!(child_path("electronics", "phones"), "electronics/phones");
        assert_eq!(child_path("electronics", "/phones/"), "electronics/phones");
    }

    #[test]
    fn localized_text_falls_back() {
        let text: LocalizedText =
            serde_json::from_str(r#"{"en": "Phones", "ar": "هواتف", "fr": ""}"#).unwrap();
        assert_eq!(text.get(&Locale::new("ar")), Some("هواتف"));
        assert_eq!(text.get(&Locale::new("fr")), Some("Phones"));
        assert_eq!(text.get(&Locale::new("de")), Some("Phones"));

        let only_ar: LocalizedText = serde_json::from_str(r#"{"ar": "هواتف"}"#).unwrap();
        assert_eq!(only_ar.get(&Locale::default()), Some("هواتف"));

        let plain: LocalizedText = serde_json::from_str(r#""Phones""#).unwrap();
        assert_eq!(plain.get(&Locale::new("ar")), Some("Phones"));
        assert_eq!(localized(None, &Locale::default(), "fallback"), "fallback");
    }

    #[test]
    fn blank_locale_is_default() {
        assert_eq!(Locale::new("  "), Locale::default());
        assert_eq!(Locale::new("AR").as_str(), "ar");
    }
}
