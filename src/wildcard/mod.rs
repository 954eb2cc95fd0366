//! Catch-all ("wildcard") domain detection.
//!
//! A domain is probed with a random mailbox that cannot exist; if its
//! servers accept it, acceptance means nothing for that domain. Results are
//! cached for the whole run and each domain is probed at most once, even
//! when several workers ask at the same time.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rand::{Rng, distributions::Alphanumeric};
use tracing::debug;

pub const PROBE_LOCAL_PART_LEN: usize = 32;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardStatus {
    /// The random mailbox was accepted.
    Wildcard,
    /// The random mailbox was rejected.
    NotWildcard,
    /// The probe could not conclude (resolution or connection failure).
    Unknown,
}

impl fmt::Display for WildcardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wildcard => "wildcard",
            Self::NotWildcard => "not wildcard",
            Self::Unknown => "wildcard status unknown",
        })
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainProbeResult {
    pub domain: String,
    pub status: WildcardStatus,
    pub diagnostic: Option<String>,
}

impl DomainProbeResult {
    pub fn new(
        domain: impl Into<String>,
        status: WildcardStatus,
        diagnostic: Option<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            status,
            diagnostic,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.status == WildcardStatus::Wildcard
    }
}

type Slot = Arc<OnceLock<DomainProbeResult>>;

/// Run-scoped cache of per-domain probe results.
#[derive(Default)]
pub struct WildcardDetector {
    slots: Mutex<HashMap<String, Slot>>,
    probes: AtomicUsize,
}

impl WildcardDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `domain`, running `probe` the first time only.
    ///
    /// Concurrent callers for the same domain wait for the single probe in
    /// flight; callers for other domains are not blocked.
    pub fn status_for<F>(&self, domain: &str, probe: F) -> DomainProbeResult
    where
        F: FnOnce(&str) -> DomainProbeResult,
    {
        let key = domain.to_ascii_lowercase();
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        slot.get_or_init(|| {
            self.probes.fetch_add(1, Ordering::SeqCst);
            debug!(domain = %key, "probing domain for wildcard acceptance");
            probe(&key)
        })
        .clone()
    }

    pub fn cached(&self, domain: &str) -> Option<DomainProbeResult> {
        let slots = self.slots.lock();
        slots
            .get(&domain.to_ascii_lowercase())
            .and_then(|slot| slot.get().cloned())
    }

    /// Number of probes actually run.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

/// 32 random alphanumerics: no real mailbox is named like this.
pub fn random_local_part() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PROBE_LOCAL_PART_LEN)
        .map(char::from)
        .collect()
}
