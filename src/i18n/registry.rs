//! Language registry: configuration-backed language provider.
//!
//! Stands in for the hosted localization platform. The list of active
//! languages and the default language are fixed at startup from
//! configuration and handed to request handlers through application state.

use super::language::{is_valid_code, ActiveLanguage};
use super::LanguageProvider;
use anyhow::{bail, Result};

/// Fallback default when no languages are configured at all.
const FALLBACK_DEFAULT: &str = "en";

/// Configuration-backed [`LanguageProvider`].
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<ActiveLanguage>,
    default_code: String,
}

impl LanguageRegistry {
    /// Build a registry from an already parsed language list.
    ///
    /// # Arguments
    /// * `languages` - Active languages in display order
    /// * `default_code` - Default language; `None` picks the first active one
    ///
    /// # Returns
    /// * `Err` if the default is not one of a non-empty active set
    pub fn new(languages: Vec<ActiveLanguage>, default_code: Option<&str>) -> Result<Self> {
        let default_code = match default_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                if !languages.is_empty() && !languages.iter().any(|l| l.code == code) {
                    bail!("Default language '{}' is not an active language", code);
                }
                code.to_string()
            }
            None => languages
                .first()
                .map(|l| l.code.clone())
                .unwrap_or_else(|| FALLBACK_DEFAULT.to_string()),
        };

        Ok(Self {
            languages,
            default_code,
        })
    }

    /// Build a registry from a `code[:name]` comma separated list.
    pub fn from_list(list: &str, default_code: Option<&str>) -> Result<Self> {
        Self::new(parse_language_list(list)?, default_code)
    }
}

impl LanguageProvider for LanguageRegistry {
    fn active_languages(&self) -> Vec<ActiveLanguage> {
        self.languages.clone()
    }

    fn default_language(&self) -> String {
        self.default_code.clone()
    }
}

/// Parse `"en:English,fr:Français,de"` into active languages.
///
/// A missing name defaults to the code. Blank items are ignored.
pub fn parse_language_list(list: &str) -> Result<Vec<ActiveLanguage>> {
    let mut languages: Vec<ActiveLanguage> = Vec::new();

    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (code, name) = match item.split_once(':') {
            Some((code, name)) => (code.trim(), name.trim()),
            None => (item, ""),
        };

        if !is_valid_code(code) {
            bail!("Invalid language code: '{}'", code);
        }
        if languages.iter().any(|l| l.code == code) {
            bail!("Duplicate language code: '{}'", code);
        }

        let name = if name.is_empty() { code } else { name };
        languages.push(ActiveLanguage::new(code, name));
    }

    Ok(languages)
}
