//! Input validation for text that ends up in generation prompts.
//!
//! All validators return a [`ValidationResult`] instead of an error; the
//! injection screen is a denylist of phrasings and only a first line of
//! defense.

mod context;
mod fields;
mod payload;
mod sanitize;

pub use context::{validate_context, MAX_CONTEXT_FIELDS, MAX_CONTEXT_FIELD_LENGTH};
pub use fields::{
    validate_duration, validate_idea, validate_track, validate_tts_text, validate_type,
    validate_voice_id, ALLOWED_TRACKS, DEFAULT_VOICE_ID, MAX_DURATION_MINUTES, MAX_IDEA_LENGTH,
    MAX_IDENTIFIER_LENGTH, MAX_TTS_TEXT_LENGTH, MIN_DURATION_MINUTES,
};
pub use payload::{
    validate_payload, MAX_DOCUMENT_LENGTH, MAX_MESSAGE_LENGTH, MAX_TRANSCRIPT_LENGTH,
};
pub use sanitize::{
    contains_injection, sanitize, sanitize_str, SanitizeOptions, ValidationResult,
    INJECTION_ERROR,
};
