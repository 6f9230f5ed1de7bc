//! Wait-for graph of workers and account locks
//!
//! Naive transfer workers publish which account locks they hold and which one
//! they are waiting for. The deadlock phase polls the graph to confirm a
//! circular wait before it cancels anyone.
//!
//! # Design
//!
//! Two `DashMap`s record the edges: account → holding worker, and worker →
//! awaited account. A deadlock is a cycle when following
//! `worker --waits for--> account --held by--> worker`.
//!
//! The graph is diagnostic only. No lock decision is ever made from it, so a
//! momentarily stale edge cannot affect correctness.

use crate::types::{AccountId, WorkerId};
use dashmap::DashMap;
use std::collections::HashMap;

/// Concurrent record of hold and wait edges
#[derive(Debug, Default)]
pub struct WaitForGraph {
    /// Account currently held, keyed by account id
    holders: DashMap<AccountId, WorkerId>,

    /// Account a blocked worker is waiting for, keyed by worker id
    waiting: DashMap<WorkerId, AccountId>,
}

impl WaitForGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `worker` holds `account` until the returned entry is dropped
    pub fn track_hold(&self, account: AccountId, worker: WorkerId) -> HoldEntry<'_> {
        self.holders.insert(account, worker);
        HoldEntry {
            graph: self,
            account,
            worker,
        }
    }

    /// Record that `worker` is blocked waiting for `account`
    pub fn begin_wait(&self, worker: WorkerId, account: AccountId) {
        self.waiting.insert(worker, account);
    }

    /// Clear the wait edge of `worker`
    pub fn end_wait(&self, worker: WorkerId) {
        self.waiting.remove(&worker);
    }

    /// Worker currently recorded as holding `account`
    pub fn holder_of(&self, account: AccountId) -> Option<WorkerId> {
        self.holders.get(&account).map(|entry| *entry.value())
    }

    /// Account `worker` is currently recorded as waiting for
    pub fn waiting_on(&self, worker: WorkerId) -> Option<AccountId> {
        self.waiting.get(&worker).map(|entry| *entry.value())
    }

    /// Find a circular wait, if any
    ///
    /// Returns the workers of the first cycle found, starting from the lowest
    /// worker id on it and listed in wait order.
    pub fn find_cycle(&self) -> Option<Vec<WorkerId>> {
        // Copy both maps first so no shard lock is held while walking.
        let waiting: HashMap<WorkerId, AccountId> = self
            .waiting
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        let holders: HashMap<AccountId, WorkerId> = self
            .holders
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();

        let mut starts: Vec<WorkerId> = waiting.keys().copied().collect();
        starts.sort_unstable();

        for start in starts {
            let mut path = vec![start];
            let mut current = start;
            while let Some(holder) = waiting
                .get(&current)
                .and_then(|account| holders.get(account))
                .copied()
            {
                if holder == start {
                    return Some(path);
                }
                if path.contains(&holder) {
                    // Cycle that does not pass through `start`; a later start finds it.
                    break;
                }
                path.push(holder);
                current = holder;
            }
        }
        None
    }
}

/// Hold edge that is removed from the graph when dropped
#[derive(Debug)]
pub struct HoldEntry<'a> {
    graph: &'a WaitForGraph,
    account: AccountId,
    worker: WorkerId,
}

impl Drop for HoldEntry<'_> {
    fn drop(&mut self) {
        // Another worker may already have taken the lock and overwritten the edge.
        self.graph
            .holders
            .remove_if(&self.account, |_, holder| *holder == self.worker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph_has_no_cycle() {
        let graph = WaitForGraph::new();
        assert_eq!(graph.find_cycle(), None);
    }

    #[test]
    fn test_hold_entry_clears_on_drop() {
        let graph = WaitForGraph::new();

        let entry = graph.track_hold(0, 1);
        assert_eq!(graph.holder_of(0), Some(1));

        drop(entry);
        assert_eq!(graph.holder_of(0), None);
    }

    #[test]
    fn test_stale_hold_entry_keeps_newer_holder() {
        let graph = WaitForGraph::new();

        let old = graph.track_hold(0, 1);
        let _new = graph.track_hold(0, 2);
        drop(old);

        assert_eq!(graph.holder_of(0), Some(2));
    }

    #[test]
    fn test_wait_without_cycle() {
        let graph = WaitForGraph::new();

        let _hold = graph.track_hold(0, 1);
        graph.begin_wait(2, 0);

        assert_eq!(graph.waiting_on(2), Some(0));
        assert_eq!(graph.find_cycle(), None);

        graph.end_wait(2);
        assert_eq!(graph.waiting_on(2), None);
    }

    #[test]
    fn test_two_worker_cycle() {
        let graph = WaitForGraph::new();

        let _a = graph.track_hold(0, 1);
        let _b = graph.track_hold(1, 2);
        graph.begin_wait(1, 1);
        graph.begin_wait(2, 0);

        assert_eq!(graph.find_cycle(), Some(vec![1, 2]));
    }

    #[test]
    fn test_cycle_reached_through_a_tail() {
        let graph = WaitForGraph::new();

        // Worker 1 waits on the cycle formed by workers 2 and 3.
        let _a = graph.track_hold(0, 2);
        let _b = graph.track_hold(1, 3);
        graph.begin_wait(1, 0);
        graph.begin_wait(2, 1);
        graph.begin_wait(3, 0);

        assert_eq!(graph.find_cycle(), Some(vec![2, 3]));
    }

    #[test]
    fn test_releasing_a_lock_breaks_the_cycle() {
        let graph = WaitForGraph::new();

        let a = graph.track_hold(0, 1);
        let _b = graph.track_hold(1, 2);
        graph.begin_wait(1, 1);
        graph.begin_wait(2, 0);
        drop(a);

        assert_eq!(graph.find_cycle(), None);
    }
}
