//! Free-text sanitization and prompt-injection screening.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Message returned for any injection match. Never more specific.
pub const INJECTION_ERROR: &str = "Invalid input detected";

/// Characters of a rejected input kept in the audit log.
const LOG_SAMPLE_CHARS: usize = 100;

/// Imperative phrasings used to override prompt instructions.
///
/// Each pattern pairs a verb with an object so that words like "system" or
/// "instructions" on their own never match.
static INJECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(ignore|disregard|forget|skip)\s+(all\s+)?(of\s+)?(the\s+|your\s+)?(previous|prior|above|earlier|preceding)\s+(instructions?|prompts?|rules|directions)",
        r"(?i)\b(reveal|show|print|display|output|repeat|leak)\s+(me\s+)?(your|the)\s+((system|hidden)\s+(prompt|instructions|message)|(initial|original)\s+(system\s+)?prompt)",
        r"(?i)\b(reveal|show|print|leak)\s+(me\s+)?your\s+(prompt|instructions)",
        r"(?i)\bpretend\s+(that\s+)?(you\s+are|you're|to\s+be)\b",
        r"(?i)\byou\s+are\s+now\s+(dan\b|unrestricted|unfiltered|jailbroken|no\s+longer\s+bound|free\s+(of|from)\s+(all\s+|any\s+)?(rules|restrictions)|an?\s+(ai|assistant|model|chatbot)\s+(that|without|with\s+no)\b|in\s+(developer|god|jailbreak|unrestricted)\s+mode)",
        r"(?i)\bact\s+as\s+(if\s+you\s+(are|were)|an?\s+(unrestricted|unfiltered|different)\b)",
        r"(?i)\bfrom\s+now\s+on\s*,?\s+(you|your|ignore|always|only|respond|answer)\b",
        r"(?i)\b(new|updated)\s+instructions?\s*:",
        r"(?i)\boverride\s+(your|the|all|any)\s+(previous\s+)?(instructions|rules|guidelines|safety)",
        r"(?im)(^|[.!?]\s+)\s*system\s*:",
        r"(?i)\[\s*/?\s*(system|inst)\s*\]",
        r"(?i)<\s*/?\s*system\s*>",
        r"(?i)<\|im_(start|end)\|>",
        r"(?i)###\s*(system|instructions?)\b",
        r"(?i)\b(dan\s+mode|developer\s+mode\s+(enabled|on))\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("INJECTION_PATTERNS: invalid regex pattern"))
    .collect()
});

/// Options for [`sanitize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Maximum length in characters after cleaning
    pub max_length: usize,
    /// Accept null and empty input as an empty string
    pub allow_empty: bool,
    /// Screen the cleaned text for injection phrasings
    pub check_injection: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            max_length: 1000,
            allow_empty: false,
            check_injection: true,
        }
    }
}

impl SanitizeOptions {
    /// Required, injection-checked text of at most `max_length` characters.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            ..Self::default()
        }
    }
}

/// Outcome of a validation.
///
/// Errors are values: callers check `is_valid` (or use
/// [`ValidationResult::into_result`]) before using `sanitized`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult<T = String> {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized: Option<T>,
}

impl<T> ValidationResult<T> {
    /// A successful result carrying the cleaned value.
    pub fn valid(value: T) -> Self {
        Self {
            is_valid: true,
            error: None,
            sanitized: Some(value),
        }
    }

    /// A failed result with a caller-facing reason.
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            sanitized: None,
        }
    }

    /// Convert into a `Result`, with the error message on failure.
    pub fn into_result(self) -> Result<T, String> {
        match (self.is_valid, self.sanitized) {
            (true, Some(value)) => Ok(value),
            _ => Err(self
                .error
                .unwrap_or_else(|| "Invalid input".to_string())),
        }
    }
}

/// Sanitize a JSON value expected to hold free text.
///
/// Checks run cheapest first: type, presence, cleaning, length, then the
/// injection patterns.
pub fn sanitize(input: &Value, options: &SanitizeOptions) -> ValidationResult {
    match input {
        Value::String(s) => sanitize_str(s, options),
        Value::Null if options.allow_empty => ValidationResult::valid(String::new()),
        Value::Null => ValidationResult::invalid("Input is required"),
        _ => ValidationResult::invalid("Input must be a string"),
    }
}

/// Sanitize a string.
pub fn sanitize_str(input: &str, options: &SanitizeOptions) -> ValidationResult {
    let cleaned = clean(input);

    if cleaned.is_empty() && !options.allow_empty {
        return ValidationResult::invalid("Input cannot be empty");
    }

    if cleaned.chars().count() > options.max_length {
        return ValidationResult::invalid(format!(
            "Input exceeds maximum length of {} characters",
            options.max_length
        ));
    }

    if options.check_injection {
        if let Some(pattern) = find_injection(&cleaned) {
            warn!(
                pattern = pattern,
                sample = %truncate_chars(&cleaned, LOG_SAMPLE_CHARS),
                "Potential prompt injection rejected"
            );
            return ValidationResult::invalid(INJECTION_ERROR);
        }
    }

    ValidationResult::valid(cleaned)
}

/// Whether the text matches any injection pattern.
pub fn contains_injection(text: &str) -> bool {
    find_injection(text).is_some()
}

/// Strip ASCII control characters other than tab, newline and carriage
/// return, then trim surrounding whitespace.
fn clean(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| !is_stripped_control(*c)).collect();
    stripped.trim().to_string()
}

fn is_stripped_control(c: char) -> bool {
    matches!(
        c,
        '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}'
    )
}

/// Index of the first matching pattern.
fn find_injection(text: &str) -> Option<usize> {
    INJECTION_PATTERNS.iter().position(|re| re.is_match(text))
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
