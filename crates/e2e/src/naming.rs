//! Unique names for fixtures
//!
//! Wall-clock timestamps alone collide when scenarios start within the same
//! millisecond, so every name also carries a process-wide sequence number and
//! a random tag fixed per generator.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::distributions::Alphanumeric;
use rand::Rng;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Produces names that are unique within the process and, through the random
/// tag, across concurrently running processes.
#[derive(Debug, Clone)]
pub struct UniqueNames {
    tag: String,
}

impl Default for UniqueNames {
    fn default() -> Self {
        Self::new()
    }
}

impl UniqueNames {
    pub fn new() -> Self {
        let tag: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(4)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self { tag }
    }

    /// Generator with a fixed tag, for reproducible output in tests.
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Uniqueness token: `<millis>-<sequence><tag>`.
    pub fn token(&self) -> String {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let millis = chrono::Utc::now().timestamp_millis();
        format!("{}-{}{}", millis, seq, self.tag)
    }

    /// Human-readable entity name, e.g. `Retirement 1700000000000-4k2z9`.
    pub fn name(&self, prefix: &str) -> String {
        format!("{} {}", prefix.trim(), self.token())
    }

    /// Login name; restricted to characters every username validator accepts.
    pub fn username(&self) -> String {
        format!("user_{}", self.token().replace('-', "_"))
    }
}
