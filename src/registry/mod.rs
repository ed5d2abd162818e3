//! Chain state registry
//!
//! Identity → runtime state for every launched chain. No entry means not
//! launched. Plain map semantics; the orchestrator serializes access behind
//! a lock and never holds it across RPC calls.

mod state;

pub use state::{ChainRuntimeState, Lifecycle};

use std::collections::HashMap;

#[derive(Debug)]
pub struct ChainStateRegistry<H> {
    entries: HashMap<String, ChainRuntimeState<H>>,
}

impl<H> Default for ChainStateRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ChainStateRegistry<H> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Insert or replace, returning the previous entry for the identity
    pub fn set(&mut self, state: ChainRuntimeState<H>) -> Option<ChainRuntimeState<H>> {
        self.entries.insert(state.id.clone(), state)
    }

    pub fn get(&self, id: &str) -> Option<&ChainRuntimeState<H>> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ChainRuntimeState<H>> {
        self.entries.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<ChainRuntimeState<H>> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&ChainRuntimeState<H>),
    {
        self.entries.values().for_each(|state| f(state));
    }

    /// Flip the auto-mine flag. Returns the new value, or None without an entry.
    pub fn toggle_auto_mine(&mut self, id: &str) -> Option<bool> {
        self.entries.get_mut(id).map(|state| {
            state.auto_mine = !state.auto_mine;
            state.auto_mine
        })
    }

    /// Remove every entry matching `predicate`
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<ChainRuntimeState<H>>
    where
        F: FnMut(&mut ChainRuntimeState<H>) -> bool,
    {
        let doomed: Vec<String> = self
            .entries
            .values_mut()
            .filter_map(|state| predicate(state).then(|| state.id.clone()))
            .collect();
        doomed
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .collect()
    }

    pub fn drain(&mut self) -> Vec<ChainRuntimeState<H>> {
        self.entries.drain().map(|(_, state)| state).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
