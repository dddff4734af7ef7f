//! Cooperative cancellation for in-flight request work.
//!
//! One `CancelToken` is shared by a `RequestOrchestrator` run, its
//! `BatchCaller`, and every `DirectCaller` it spawns — cancelling the
//! token stops new `DirectCaller` tasks from being scheduled and makes
//! in-flight ones return a `timeout`-flavored result instead of raising.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Looks up the active cancellation token for a request by id, so an
/// external caller (the gateway, a test) can cancel a run it doesn't hold
/// a direct handle to.
pub struct CancelMap {
    tokens: Mutex<HashMap<String, CancelToken>>,
}

impl Default for CancelMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelMap {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, key: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(key.to_owned(), token.clone());
        token
    }

    pub fn cancel(&self, key: &str) -> bool {
        if let Some(token) = self.tokens.lock().get(key) {
            token.cancel();
            true
        } else {
            false
        }
    }

    pub fn remove(&self, key: &str) {
        self.tokens.lock().remove(key);
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.tokens.lock().contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lifecycle() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clone_shares_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn map_register_cancel_remove() {
        let map = CancelMap::new();
        let token = map.register("r1");
        assert!(map.is_running("r1"));
        assert!(map.cancel("r1"));
        assert!(token.is_cancelled());
        map.remove("r1");
        assert!(!map.is_running("r1"));
        assert!(!map.cancel("r1"));
    }

    #[test]
    fn cancel_unregistered_key_returns_false() {
        let map = CancelMap::new();
        assert!(!map.cancel("ghost"));
    }
}
