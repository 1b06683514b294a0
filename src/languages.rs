//! Compiled-in table of supported languages

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// Language code used when detection fails or a code is unknown
pub const DEFAULT_LANGUAGE: &str = "en";

/// A supported language and its engine-specific codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageRecord {
    /// Short language code (e.g. "en")
    #[serde(skip)]
    pub code: &'static str,
    /// Human readable name
    pub name: &'static str,
    /// Flag emoji shown by clients
    pub flag: &'static str,
    /// Greeting in the language itself
    pub greeting: &'static str,
    /// Code passed to the speech synthesis engine
    pub tts_code: &'static str,
    /// Locale passed to speech recognition on the client
    pub stt_code: &'static str,
    /// ISO 639-3 code used by the language detector
    #[serde(skip)]
    pub iso639_3: &'static str,
}

/// All supported languages, in display order
pub static SUPPORTED_LANGUAGES: &[LanguageRecord] = &[
    LanguageRecord {
        code: "en",
        name: "English",
        flag: "\u{1f1ec}\u{1f1e7}",
        greeting: "Hello! I can help you in English.",
        tts_code: "en",
        stt_code: "en-US",
        iso639_3: "eng",
    },
    LanguageRecord {
        code: "hi",
        name: "Hindi",
        flag: "\u{1f1ee}\u{1f1f3}",
        greeting: "नमस्ते! मैं हिंदी में आपकी मदद कर सकता हूं।",
        tts_code: "hi",
        stt_code: "hi-IN",
        iso639_3: "hin",
    },
    LanguageRecord {
        code: "es",
        name: "Spanish",
        flag: "\u{1f1ea}\u{1f1f8}",
        greeting: "¡Hola! Puedo ayudarte en español.",
        tts_code: "es",
        stt_code: "es-ES",
        iso639_3: "spa",
    },
    LanguageRecord {
        code: "fr",
        name: "French",
        flag: "\u{1f1eb}\u{1f1f7}",
        greeting: "Bonjour! Je peux vous aider en français.",
        tts_code: "fr",
        stt_code: "fr-FR",
        iso639_3: "fra",
    },
];

/// Find a language record by its short code
#[must_use]
pub fn lookup(code: &str) -> Option<&'static LanguageRecord> {
    SUPPORTED_LANGUAGES.iter().find(|l| l.code == code)
}

/// Find a language record, falling back to the default language
#[must_use]
pub fn lookup_or_default(code: &str) -> &'static LanguageRecord {
    lookup(code).unwrap_or_else(default_language)
}

/// The default language record
///
/// # Panics
///
/// Never in practice: the default code is part of the compiled-in table.
#[must_use]
#[allow(clippy::missing_panics_doc)]
pub fn default_language() -> &'static LanguageRecord {
    &SUPPORTED_LANGUAGES[0]
}

/// Whether `code` is a supported language
#[must_use]
pub fn is_supported(code: &str) -> bool {
    lookup(code).is_some()
}

/// Serializes the language table as a JSON object keyed by code, in table order
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageTable;

impl Serialize for LanguageTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SUPPORTED_LANGUAGES.len()))?;
        for lang in SUPPORTED_LANGUAGES {
            map.serialize_entry(lang.code, lang)?;
        }
        map.end()
    }
}
