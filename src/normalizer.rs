//! Canonical key derivation
//!
//! Raw identifiers from the event log are noisy: apps arrive as bundle
//! identifiers ("com.apple.Safari"), domains carry www/mobile prefixes and
//! TLD suffixes ("m.bbc.co.uk"). This module collapses both into stable,
//! human-readable keys so that usage from different spellings of the same
//! entity lands under one total.
//!
//! Both functions are pure: the same input always yields the same key.

/// Organizational bundle-id prefixes stripped from app names, checked in
/// order; first match wins and stripping is applied once.
const APP_PREFIXES: &[&str] = &[
    "com.apple.",
    "com.google.",
    "com.microsoft.",
    "org.mozilla.",
    "com.adobe.",
    "com.spotify.",
    "com.slack.",
    "com.",
];

/// Subdomain prefixes stripped from domains, checked in order, one strip only
const SUBDOMAIN_PREFIXES: &[&str] = &["m.", "mobile.", "web.", "app.", "api."];

/// Two-letter country suffixes that signal a compound TLD (e.g. "co.uk")
const COUNTRY_SUFFIXES: &[&str] = &["uk", "au", "ca", "jp"];

/// Normalizer for deriving canonical app and domain keys
pub struct Normalizer;

impl Normalizer {
    /// Canonical key for a raw application identifier.
    ///
    /// "com.apple.Safari" becomes "Safari", "org.mozilla.firefox" becomes
    /// "Firefox". Empty input is returned unchanged.
    pub fn normalize_app(raw: &str) -> String {
        if raw.is_empty() {
            return raw.to_string();
        }

        let mut rest = raw;
        for prefix in APP_PREFIXES {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped;
                break;
            }
        }

        // Anything after the first dot is treated as an extension-like suffix
        if let Some((head, _)) = rest.split_once('.') {
            if !head.is_empty() {
                rest = head;
            }
        }

        capitalize(rest)
    }

    /// Canonical key for a raw web domain.
    ///
    /// "www.youtube.com" becomes "Youtube", "m.bbc.co.uk" becomes "Bbc".
    /// Empty input is returned unchanged.
    pub fn normalize_domain(raw: &str) -> String {
        if raw.is_empty() {
            return raw.to_string();
        }

        // Blunt replace, not a prefix strip: "www." is dropped wherever it
        // appears in the string.
        let mut rest = raw.replace("www.", "");

        for prefix in SUBDOMAIN_PREFIXES {
            if let Some(stripped) = rest.strip_prefix(prefix) {
                rest = stripped.to_string();
                break;
            }
        }

        let parts: Vec<&str> = rest.split('.').collect();
        let label = match parts.len() {
            0 | 1 => rest.as_str(),
            n => {
                // Compound TLDs like "co.uk" hide the registrable label one
                // segment deeper.
                if n >= 3 && COUNTRY_SUFFIXES.contains(&parts[n - 1]) {
                    parts[n - 3]
                } else {
                    parts[n - 2]
                }
            }
        };

        capitalize(label)
    }
}

/// Upper-case the first character and lower-case the remainder, so keys
/// compare stably regardless of source casing.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
