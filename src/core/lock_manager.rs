//! Per-account locking with ordered acquisition and bounded retries
//!
//! This module provides the `LockManager`, which hands out exclusive access to
//! the accounts touched by a transaction.
//!
//! # Design
//!
//! Every account id maps to its own `tokio::sync::Mutex<()>`, created on first
//! use and kept in a `DashMap`. A transaction locks at most two accounts and
//! always takes them in ascending id order, so two transactions over the same
//! pair can never wait on each other in a cycle. An absent id is skipped and
//! an id that appears twice is locked once.
//!
//! Mutexes are never evicted: the map grows by one entry per distinct account
//! id ever locked and lives as long as the `LockManager`.
//!
//! Each acquisition is attempted up to `LockingConfig::max_attempts` times.
//! An attempt waits at most `attempt_timeout`; between attempts the task
//! sleeps for an exponentially growing, jittered delay.
//!
//! # Architecture
//!
//! ```text
//! LockManager
//!     ├── DashMap<AccountId, Arc<Mutex<()>>>  (one mutex per account)
//!     ├── Arc<LockCounters>                   (shared with every guard)
//!     └── LockingConfig                       (retry policy)
//!
//! AccountLocks (RAII guard)
//!     └── Vec<(AccountId, OwnedMutexGuard)>   (in acquisition order)
//! ```
//!
//! # Counters
//!
//! The lock counter grows by one per mutex acquired and the unlock counter by
//! one per mutex released. Once every guard has been dropped the two are
//! equal.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::{debug, warn};
use rand::Rng;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::LockingConfig;
use crate::types::{AccountId, BankError};

/// Lock and unlock totals for one `LockManager`
#[derive(Debug, Default)]
pub struct LockCounters {
    locks: AtomicU64,
    unlocks: AtomicU64,
}

impl LockCounters {
    pub fn lock_count(&self) -> u64 {
        self.locks.load(Ordering::SeqCst)
    }

    pub fn unlock_count(&self) -> u64 {
        self.unlocks.load(Ordering::SeqCst)
    }
}

/// Locks held on behalf of one transaction
///
/// Dropping the guard releases the locks in reverse acquisition order and
/// bumps the unlock counter once per lock.
#[derive(Debug)]
pub struct AccountLocks {
    guards: Vec<(AccountId, OwnedMutexGuard<()>)>,
    counters: Arc<LockCounters>,
}

impl AccountLocks {
    fn new(counters: Arc<LockCounters>) -> Self {
        Self {
            guards: Vec::with_capacity(2),
            counters,
        }
    }

    fn push(&mut self, account: AccountId, guard: OwnedMutexGuard<()>) {
        self.counters.locks.fetch_add(1, Ordering::SeqCst);
        self.guards.push((account, guard));
    }

    /// Account ids in the order they were locked
    pub fn held_ids(&self) -> Vec<AccountId> {
        self.guards.iter().map(|(id, _)| *id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl Drop for AccountLocks {
    fn drop(&mut self) {
        while let Some((account, guard)) = self.guards.pop() {
            drop(guard);
            self.counters.unlocks.fetch_add(1, Ordering::SeqCst);
            debug!("Released lock on account {}", account);
        }
    }
}

/// Order in which the accounts of a transaction must be locked
///
/// Ascending by id; absent ids are dropped and duplicates collapse to one.
pub fn lock_order(first: Option<AccountId>, second: Option<AccountId>) -> Vec<AccountId> {
    match (first, second) {
        (Some(a), Some(b)) if a == b => vec![a],
        (Some(a), Some(b)) => vec![a.min(b), a.max(b)],
        (Some(a), None) | (None, Some(a)) => vec![a],
        (None, None) => Vec::new(),
    }
}

/// Sleep before retry number `attempt + 1`
///
/// `min(max_delay, base_delay * 2^attempt)` scaled by a random factor in
/// `[0.75, 1.25]`.
pub fn backoff_delay(attempt: u32, config: &LockingConfig) -> Duration {
    let exponential = 2u32
        .checked_pow(attempt)
        .and_then(|factor| config.base_delay.checked_mul(factor))
        .unwrap_or(config.max_delay)
        .min(config.max_delay);

    let jitter = rand::thread_rng().gen_range(0.75..=1.25);
    exponential.mul_f64(jitter)
}

/// Hands out ordered, retried locks on accounts
#[derive(Debug)]
pub struct LockManager {
    mutexes: DashMap<AccountId, Arc<Mutex<()>>>,
    counters: Arc<LockCounters>,
    config: LockingConfig,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(LockingConfig::default())
    }
}

impl LockManager {
    pub fn new(config: LockingConfig) -> Self {
        Self {
            mutexes: DashMap::new(),
            counters: Arc::new(LockCounters::default()),
            config,
        }
    }

    pub fn config(&self) -> &LockingConfig {
        &self.config
    }

    /// Total number of locks acquired so far
    pub fn lock_count(&self) -> u64 {
        self.counters.lock_count()
    }

    /// Total number of locks released so far
    pub fn unlock_count(&self) -> u64 {
        self.counters.unlock_count()
    }

    /// Lock the accounts of a transaction in canonical order
    ///
    /// # Arguments
    ///
    /// * `source` - Debited account, if any
    /// * `destination` - Credited account, if any
    ///
    /// # Returns
    ///
    /// A guard holding every requested lock, or `BankError::AccountLock` for
    /// the first account that could not be acquired. Locks taken before the
    /// failure are released before the error is returned.
    pub async fn lock_accounts(
        &self,
        source: Option<AccountId>,
        destination: Option<AccountId>,
    ) -> Result<AccountLocks, BankError> {
        let mut locks = AccountLocks::new(Arc::clone(&self.counters));

        for account in lock_order(source, destination) {
            // On error `locks` is dropped here, releasing what was acquired.
            let guard = self.acquire(account).await?;
            debug!("Locked account {}", account);
            locks.push(account, guard);
        }

        Ok(locks)
    }

    /// Release a guard explicitly
    pub fn unlock_accounts(&self, locks: AccountLocks) {
        drop(locks);
    }

    fn mutex_for(&self, account: AccountId) -> Arc<Mutex<()>> {
        let entry = self
            .mutexes
            .entry(account)
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }

    async fn acquire(&self, account: AccountId) -> Result<OwnedMutexGuard<()>, BankError> {
        let mutex = self.mutex_for(account);
        let started = Instant::now();

        for attempt in 0..self.config.max_attempts {
            let lock = Arc::clone(&mutex).lock_owned();
            match tokio::time::timeout(self.config.attempt_timeout, lock).await {
                Ok(guard) => return Ok(guard),
                Err(_) => {
                    debug!(
                        "Attempt {}/{} to lock account {} timed out",
                        attempt + 1,
                        self.config.max_attempts,
                        account
                    );
                    if attempt + 1 < self.config.max_attempts {
                        tokio::time::sleep(backoff_delay(attempt, &self.config)).await;
                    }
                }
            }
        }

        let elapsed_ms = started.elapsed().as_millis();
        warn!(
            "Giving up on account {} after {} attempts ({} ms)",
            account, self.config.max_attempts, elapsed_ms
        );
        Err(BankError::account_lock(
            account,
            self.config.max_attempts,
            elapsed_ms,
        ))
    }
}
