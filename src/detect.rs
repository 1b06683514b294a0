//! Language detection restricted to the supported language set

use whatlang::{Detector, Lang};

use crate::languages::{self, DEFAULT_LANGUAGE, SUPPORTED_LANGUAGES};

/// Guesses below this confidence fall back to the default language.
/// Greetings and one-word replies score well under it.
const MIN_CONFIDENCE: f64 = 0.2;

/// Detects which supported language a message is written in
pub struct LanguageDetector {
    detector: Detector,
}

impl LanguageDetector {
    /// Create a detector limited to the compiled-in languages
    #[must_use]
    pub fn new() -> Self {
        let allowlist: Vec<Lang> = SUPPORTED_LANGUAGES
            .iter()
            .filter_map(|l| Lang::from_code(l.iso639_3))
            .collect();

        Self {
            detector: Detector::with_allowlist(allowlist),
        }
    }

    /// Detect the language of `text`
    ///
    /// Returns the default language code when the text carries no usable
    /// signal (empty, digits, symbols), is too short to tell apart, or
    /// resolves outside the supported set.
    #[must_use]
    pub fn detect(&self, text: &str) -> &'static str {
        let text = text.trim();
        if text.is_empty() {
            return DEFAULT_LANGUAGE;
        }

        let Some(info) = self.detector.detect(text) else {
            tracing::debug!("language detection inconclusive, using default");
            return DEFAULT_LANGUAGE;
        };

        if !info.is_reliable() && info.confidence() < MIN_CONFIDENCE {
            tracing::debug!(
                guess = info.lang().code(),
                confidence = info.confidence(),
                "low-confidence language guess, using default"
            );
            return DEFAULT_LANGUAGE;
        }

        let iso = info.lang().code();
        SUPPORTED_LANGUAGES
            .iter()
            .find(|l| l.iso639_3 == iso)
            .map_or(DEFAULT_LANGUAGE, |l| l.code)
    }

    /// Display name for a language code, defaulting to the default language's name
    #[must_use]
    pub fn display_name(code: &str) -> &'static str {
        languages::lookup_or_default(code).name
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new()
    }
}
