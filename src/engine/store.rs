//! Per-user conversation context storage.
//!
//! Each user identifier owns a *cell*: an `Arc<Mutex<Option<Context>>>` kept in
//! a sharded [`DashMap`]. The map shard is only held long enough to fetch or
//! insert the cell; the turn itself runs under the cell's own mutex. Turns for
//! different users therefore never wait on each other, while turns for the
//! same user are serialized for their whole read-modify-write cycle.
//!
//! ```text
//! DashMap<user, Cell> ── shard lock (brief) ──▶ Arc<Mutex<Option<ctx>>>
//!                                                  │ lock_arc (whole turn)
//!                                                  v
//!                                             ContextLease
//!                                               get_or_create -> working copy
//!                                               commit(copy)  -> stored
//! ```
//!
//! ## Invariants
//!
//! - A cell holding `None` has no committed context yet; readers see the
//!   default context but nothing is stored until a commit.
//! - A lease that is dropped without `commit` leaves the stored context as it
//!   was, so a turn that aborts half-way is never observable.
//! - Cells are only removed from the map while no lease or waiter holds a
//!   clone of their `Arc` (`strong_count == 1` under the shard lock).

use crate::ConversationContext;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::sync::Arc;

type Cell = Arc<Mutex<Option<ConversationContext>>>;

/// Concurrent map from user identifier to [`ConversationContext`].
#[derive(Debug, Default)]
pub struct ContextStore {
    cells: DashMap<String, Cell>,
}

/// Exclusive access to one user's context for the duration of a turn.
pub struct ContextLease {
    user: String,
    guard: ArcMutexGuard<RawMutex, Option<ConversationContext>>,
}

impl ContextLease {
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The stored context, or a fresh one if the user has none yet.
    pub fn get_or_create(&self) -> ConversationContext {
        self.guard.clone().unwrap_or_default()
    }

    /// Replace the stored context and release the user's lock.
    pub fn commit(mut self, ctx: ConversationContext) {
        *self.guard = Some(ctx);
    }
}

impl std::fmt::Debug for ContextLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLease").field("user", &self.user).field("context", &*self.guard).finish()
    }
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, user: &str) -> Cell {
        if let Some(cell) = self.cells.get(user) {
            return Arc::clone(cell.value());
        }
        Arc::clone(self.cells.entry(user.to_string()).or_default().value())
    }

    /// Take the user's lock. Blocks while another turn for the same user
    /// holds it; never blocks on other users.
    pub fn lock(&self, user: &str) -> ContextLease {
        let cell = self.cell(user);
        ContextLease { user: user.to_string(), guard: cell.lock_arc() }
    }

    /// Snapshot of the user's context, or a fresh default. Nothing is stored.
    pub fn get_or_create(&self, user: &str) -> ConversationContext {
        self.get(user).unwrap_or_default()
    }

    /// Snapshot of the user's committed context, if any.
    pub fn get(&self, user: &str) -> Option<ConversationContext> {
        let cell = self.cells.get(user).map(|cell| Arc::clone(cell.value()))?;
        let guard = cell.lock();
        guard.clone()
    }

    pub fn put(&self, user: &str, ctx: ConversationContext) {
        self.lock(user).commit(ctx);
    }

    /// Drop a user's context. Returns `false` if there was none or a turn
    /// for that user is in flight.
    pub fn remove(&self, user: &str) -> bool {
        self.cells.remove_if(user, |_, cell| Arc::strong_count(cell) == 1).is_some()
    }

    /// Drop every idle context last active before `cutoff`, along with cells
    /// that were never committed. Returns how many were removed.
    pub fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut evicted = 0;
        self.cells.retain(|_, cell| {
            if Arc::strong_count(cell) > 1 {
                return true;
            }
            let keep = match cell.try_lock() {
                Some(guard) => guard.as_ref().is_some_and(|ctx| ctx.last_active_at >= cutoff),
                None => true,
            };
            if !keep {
                evicted += 1;
            }
            keep
        });

        if evicted > 0 {
            tracing::debug!(evicted, %cutoff, "evicted idle conversation contexts");
        }
        evicted
    }

    /// Users with a committed context, sorted.
    pub fn users(&self) -> Vec<String> {
        let cells: Vec<(String, Cell)> =
            self.cells.iter().map(|entry| (entry.key().clone(), Arc::clone(entry.value()))).collect();

        let mut users: Vec<String> =
            cells.into_iter().filter(|(_, cell)| cell.lock().is_some()).map(|(user, _)| user).collect();
        users.sort();
        users
    }

    pub fn len(&self) -> usize {
        self.users().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::INITIAL_STATE;
    use chrono::Duration;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration as StdDuration;

    #[test]
    fn get_or_create_does_not_store_the_default() {
        let store = ContextStore::new();
        let ctx = store.get_or_create("u1");

        assert_eq!(ctx.current_state, INITIAL_STATE);
        assert!(ctx.slots.is_empty());
        assert!(store.get("u1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn put_replaces_the_context() {
        let store = ContextStore::new();
        let mut ctx = store.get_or_create("u1");
        ctx.current_state = "support".into();
        store.put("u1", ctx.clone());

        assert_eq!(store.get("u1"), Some(ctx));
        assert_eq!(store.users(), vec!["u1".to_string()]);
        assert!(store.get("u2").is_none());
    }

    #[test]
    fn dropped_lease_leaves_context_untouched() {
        let store = ContextStore::new();
        store.put("u1", ConversationContext::new());

        {
            let lease = store.lock("u1");
            let mut ctx = lease.get_or_create();
            ctx.slots.insert("half".into(), "written".into());
            // lease dropped without commit
        }

        assert!(store.get("u1").unwrap().slots.is_empty());
    }

    #[test]
    fn same_user_read_modify_write_is_serialized() {
        let store = ContextStore::new();
        let threads = 8;
        let per_thread = 200;

        thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    for _ in 0..per_thread {
                        let lease = store.lock("shared");
                        let mut ctx = lease.get_or_create();
                        let n: u32 = ctx.slot("count").map_or(0, |v| v.parse().unwrap());
                        ctx.slots.insert("count".into(), (n + 1).to_string());
                        lease.commit(ctx);
                    }
                });
            }
        });

        let total = store.get("shared").unwrap();
        assert_eq!(total.slot("count"), Some((threads * per_thread).to_string().as_str()));
    }

    #[test]
    fn held_lock_does_not_block_other_users() {
        let store = ContextStore::new();
        let held = store.lock("alice");
        let (tx, rx) = mpsc::channel();

        thread::scope(|s| {
            s.spawn(|| {
                store.put("bob", ConversationContext::new());
                tx.send(()).unwrap();
            });
            rx.recv_timeout(StdDuration::from_secs(5)).expect("bob's turn was blocked by alice");
        });

        held.commit(ConversationContext::new());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_skips_users_with_a_turn_in_flight() {
        let store = ContextStore::new();
        store.put("u1", ConversationContext::new());

        let lease = store.lock("u1");
        assert!(!store.remove("u1"));
        drop(lease);

        assert!(store.remove("u1"));
        assert!(store.get("u1").is_none());
        assert!(!store.remove("u1"));
    }

    #[test]
    fn evict_idle_removes_only_stale_contexts() {
        let store = ContextStore::new();
        let now = Utc::now();
        store.put("stale", ConversationContext::starting_at(now - Duration::hours(2)));
        store.put("fresh", ConversationContext::starting_at(now));
        drop(store.lock("never-committed"));

        assert_eq!(store.evict_idle(now - Duration::hours(1)), 2);
        assert_eq!(store.users(), vec!["fresh".to_string()]);
    }
}
