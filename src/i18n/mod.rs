//! Language handling for multilingual entries.
//!
//! The service does not own the list of languages. It asks a
//! [`LanguageProvider`] which languages are active, which one is the
//! site-wide default and which one the current viewer wants.
//!
//! # Architecture
//!
//! - `language`: the `ActiveLanguage` type, code validation and
//!   `Accept-Language` matching
//! - `registry`: `LanguageRegistry`, the configuration-backed provider
//!
//! # Example
//!
//! ```rust,ignore
//! use multilingual_text::i18n::{LanguageHints, LanguageProvider, LanguageRegistry};
//!
//! let registry = LanguageRegistry::from_list("en:English,fr:Français", None)?;
//! let lang = registry.current_language(&LanguageHints::default());
//! assert_eq!(lang, "en");
//! ```

mod language;
mod registry;

pub use language::{is_valid_code, ActiveLanguage, LanguageHints};
pub use registry::{parse_language_list, LanguageRegistry};

/// Collaborator contract for the localization platform.
///
/// Implementations must be cheap to call: every admin request and every
/// render asks for the active set again, nothing is cached across requests.
pub trait LanguageProvider: Send + Sync {
    /// Active languages, in display order.
    fn active_languages(&self) -> Vec<ActiveLanguage>;

    /// Site-wide fallback language code.
    fn default_language(&self) -> String;

    /// Resolve the viewer's language for one request.
    ///
    /// An explicit `lang` hint wins when it names an active language, then
    /// the `Accept-Language` header, then the default language.
    fn current_language(&self, hints: &LanguageHints) -> String {
        let active = self.active_languages();

        if let Some(requested) = hints.requested.as_deref() {
            if let Some(lang) = active.iter().find(|l| l.code == requested) {
                return lang.code.clone();
            }
        }

        if let Some(header) = hints.accept_language.as_deref() {
            if let Some(code) = language::match_accept_language(header, &active) {
                return code;
            }
        }

        self.default_language()
    }
}
