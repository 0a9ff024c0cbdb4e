//! Pitchguard - Rate Limiting and Input Validation for Pitch Coaching
//!
//! This crate guards the edge functions of a pitch coaching application
//! before they reach costly text generation and speech APIs. It provides a
//! fixed-window rate limiter with anonymous and authenticated tiers, a
//! prompt-injection-aware input sanitizer, and a small HTTP sidecar that runs
//! both for a request.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
pub mod validation;
