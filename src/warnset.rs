// The warn-once key-id set: tracks which signer key ids have already
// triggered a NOTTRUSTED/NOKEY warning, so a package reader only logs
// once per key instead of on every file.
//
// Modeled as an explicitly constructed service rather than bare global
// state, so tests get a fresh set per case; `global` supplies the single
// process-wide instance `read_package_file` actually uses.

use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

const DEFAULT_CAPACITY: usize = 256;

/// Bounded FIFO set of key ids already warned about once.
///
/// Key id `0` (no signature) is never recorded or seen. Mutex poisoning
/// degrades to "treat the key as new" rather than panicking.
pub struct WarnSet {
    seen: Mutex<VecDeque<u32>>,
    capacity: usize,
}

impl WarnSet {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        WarnSet {
            seen: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn was_seen(&self, key_id: u32) -> bool {
        if key_id == 0 {
            return false;
        }
        match self.seen.lock() {
            Ok(set) => set.contains(&key_id),
            Err(_) => false,
        }
    }

    /// Insert `key_id`, evicting the oldest entry once at capacity.
    /// A no-op if `key_id` is already present or is `0`.
    pub fn record(&self, key_id: u32) {
        if key_id == 0 {
            return;
        }
        let mut set = match self.seen.lock() {
            Ok(set) => set,
            Err(_) => return,
        };
        if set.contains(&key_id) {
            return;
        }
        if set.len() >= self.capacity {
            set.pop_front();
        }
        set.push_back(key_id);
    }
}

impl Default for WarnSet {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide instance `read_package_file` shares across calls.
pub fn global() -> &'static WarnSet {
    static GLOBAL: OnceLock<WarnSet> = OnceLock::new();
    GLOBAL.get_or_init(WarnSet::new)
}
