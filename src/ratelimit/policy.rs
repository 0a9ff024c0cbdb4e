//! Rate limit policies per request category and caller tier.
//!
//! Every externally facing feature belongs to a [`Category`]. Each category
//! carries two policies, one for anonymous callers and one for authenticated
//! callers. The table ships with defaults and can be overridden from YAML:
//!
//! ```yaml
//! speech:
//!   anonymous:
//!     max_requests: 3
//!     window_ms: 60000
//!   authenticated:
//!     max_requests: 30
//!     window_ms: 60000
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{GuardError, Result};

/// Window shared by all default policies.
const DEFAULT_WINDOW_MS: u64 = 60_000;

/// A category of request with its own quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Pitch and feedback text generation
    AiGeneration,
    /// Speech transcription and synthesis
    Speech,
    /// Delivery analytics over a transcript
    Analytics,
    /// Parsing uploaded documents
    DocumentParsing,
    /// Interactive question-and-answer sessions
    Interrogation,
}

impl Category {
    /// All categories, in table order.
    pub const ALL: [Category; 5] = [
        Category::AiGeneration,
        Category::Speech,
        Category::Analytics,
        Category::DocumentParsing,
        Category::Interrogation,
    ];

    /// Stable snake_case name, used in keys and URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AiGeneration => "ai_generation",
            Category::Speech => "speech",
            Category::Analytics => "analytics",
            Category::DocumentParsing => "document_parsing",
            Category::Interrogation => "interrogation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = GuardError;

    /// Accepts snake_case and kebab-case names.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| GuardError::Config(format!("unknown category: {}", s)))
    }
}

/// Caller tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Anonymous,
    Authenticated,
}

impl Tier {
    /// Tier for a caller given its authentication state.
    pub fn for_caller(authenticated: bool) -> Self {
        if authenticated {
            Tier::Authenticated
        } else {
            Tier::Anonymous
        }
    }

    /// Short name used in rate limit keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Anonymous => "anon",
            Tier::Authenticated => "auth",
        }
    }
}

/// An immutable quota: at most `max_requests` per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Requests admitted per window
    pub max_requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RateLimitPolicy {
    /// Create a policy.
    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    /// A policy over the default one-minute window.
    pub const fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, DEFAULT_WINDOW_MS)
    }
}

/// The anonymous and authenticated policies for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredPolicy {
    pub anonymous: RateLimitPolicy,
    pub authenticated: RateLimitPolicy,
}

impl TieredPolicy {
    const fn per_minute(anonymous: u32, authenticated: u32) -> Self {
        Self {
            anonymous: RateLimitPolicy::per_minute(anonymous),
            authenticated: RateLimitPolicy::per_minute(authenticated),
        }
    }

    /// The policy for a tier.
    pub fn for_tier(&self, tier: Tier) -> RateLimitPolicy {
        match tier {
            Tier::Anonymous => self.anonymous,
            Tier::Authenticated => self.authenticated,
        }
    }
}

/// Policy table keyed by [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    #[serde(default = "default_ai_generation")]
    pub ai_generation: TieredPolicy,
    #[serde(default = "default_speech")]
    pub speech: TieredPolicy,
    #[serde(default = "default_analytics")]
    pub analytics: TieredPolicy,
    #[serde(default = "default_document_parsing")]
    pub document_parsing: TieredPolicy,
    #[serde(default = "default_interrogation")]
    pub interrogation: TieredPolicy,
}

fn default_ai_generation() -> TieredPolicy {
    TieredPolicy::per_minute(10, 20)
}

fn default_speech() -> TieredPolicy {
    TieredPolicy::per_minute(3, 30)
}

fn default_analytics() -> TieredPolicy {
    TieredPolicy::per_minute(10, 30)
}

fn default_document_parsing() -> TieredPolicy {
    TieredPolicy::per_minute(3, 20)
}

fn default_interrogation() -> TieredPolicy {
    TieredPolicy::per_minute(5, 60)
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            ai_generation: default_ai_generation(),
            speech: default_speech(),
            analytics: default_analytics(),
            document_parsing: default_document_parsing(),
            interrogation: default_interrogation(),
        }
    }
}

impl PolicyTable {
    /// Load a table from a YAML file. Missing categories keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit policies");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load a table from a YAML string and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let table: PolicyTable = serde_yaml::from_str(yaml).map_err(|e| {
            GuardError::Config(format!("Failed to parse rate limit policies: {}", e))
        })?;
        table.validate()?;
        Ok(table)
    }

    /// The tiered policy for a category.
    pub fn get(&self, category: Category) -> &TieredPolicy {
        match category {
            Category::AiGeneration => &self.ai_generation,
            Category::Speech => &self.speech,
            Category::Analytics => &self.analytics,
            Category::DocumentParsing => &self.document_parsing,
            Category::Interrogation => &self.interrogation,
        }
    }

    /// Select the policy for a category and caller.
    pub fn select(&self, category: Category, authenticated: bool) -> RateLimitPolicy {
        self.get(category).for_tier(Tier::for_caller(authenticated))
    }

    /// Reject empty quotas and tables where signing in lowers the quota.
    pub fn validate(&self) -> Result<()> {
        for category in Category::ALL {
            let tiered = self.get(category);
            for (tier, policy) in [
                (Tier::Anonymous, tiered.anonymous),
                (Tier::Authenticated, tiered.authenticated),
            ] {
                if policy.max_requests == 0 || policy.window_ms == 0 {
                    return Err(GuardError::Config(format!(
                        "{} {} policy must have positive max_requests and window_ms",
                        category,
                        tier.as_str()
                    )));
                }
            }
            if tiered.authenticated.max_requests < tiered.anonymous.max_requests {
                return Err(GuardError::Config(format!(
                    "{} authenticated max_requests ({}) is lower than anonymous ({})",
                    category, tiered.authenticated.max_requests, tiered.anonymous.max_requests
                )));
            }
        }
        Ok(())
    }
}
