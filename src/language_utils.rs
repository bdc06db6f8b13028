/*!
 * Language utilities for the translation job options.
 *
 * The presentation layer offers a fixed list of languages; job options
 * accept any well-formed language tag (`xx` or `xx-YY`) so that the
 * engine decides what it supports.
 */

use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;

/// A selectable language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageOption {
    /// Display label
    pub label: &'static str,
    /// Language tag passed to the engine
    pub code: &'static str,
}

/// Languages offered for source and target selection
pub const LANGUAGE_OPTIONS: &[LanguageOption] = &[
    LanguageOption { label: "English", code: "en" },
    LanguageOption { label: "Chinese (Simplified)", code: "zh-CN" },
    LanguageOption { label: "Chinese (Traditional)", code: "zh-TW" },
    LanguageOption { label: "Japanese", code: "ja" },
    LanguageOption { label: "Korean", code: "ko" },
    LanguageOption { label: "French", code: "fr" },
    LanguageOption { label: "German", code: "de" },
    LanguageOption { label: "Spanish", code: "es" },
    LanguageOption { label: "Italian", code: "it" },
    LanguageOption { label: "Russian", code: "ru" },
    LanguageOption { label: "Arabic", code: "ar" },
];

pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";
pub const DEFAULT_TARGET_LANGUAGE: &str = "zh-CN";

static LANGUAGE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,4})?$").expect("Invalid language tag regex")
});

/// Check that a language tag is well formed
pub fn validate_language_tag(code: &str) -> Result<()> {
    if LANGUAGE_TAG_REGEX.is_match(code.trim()) {
        Ok(())
    } else {
        Err(anyhow!("Invalid language code: '{}'", code))
    }
}

/// Find a language in the fixed option list, ignoring case
pub fn find_option(code: &str) -> Option<&'static LanguageOption> {
    let code = code.trim();
    LANGUAGE_OPTIONS.iter().find(|o| o.code.eq_ignore_ascii_case(code))
}

/// Primary subtag of a language tag, lowercased (`zh-CN` -> `zh`)
pub fn primary_subtag(code: &str) -> String {
    code.trim()
        .split('-')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Get a display name for a language tag
///
/// Uses the fixed option label when available, falls back to the ISO 639
/// name of the primary subtag, and finally to the tag itself.
pub fn get_language_name(code: &str) -> String {
    if let Some(option) = find_option(code) {
        return option.label.to_string();
    }

    let primary = primary_subtag(code);
    let lang = match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    };

    lang.map(|l| l.to_name().to_string())
        .unwrap_or_else(|| code.trim().to_string())
}
