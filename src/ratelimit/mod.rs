//! Rate limiting logic and state management.

mod clock;
mod entry;
mod key;
mod limiter;
mod policy;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::RateLimitEntry;
pub use key::{derive_key, key_prefix, LimitKey, DEFAULT_TRUSTED_IP_HEADER, UNKNOWN_CLIENT};
pub use limiter::{RateLimitDecision, RateLimiter, DEFAULT_SWEEP_INTERVAL_MS};
pub use policy::{Category, PolicyTable, RateLimitPolicy, Tier, TieredPolicy};
pub use store::{MemoryStore, RateLimitStore};
