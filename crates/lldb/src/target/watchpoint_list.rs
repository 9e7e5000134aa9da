use super::watchpoint::{WatchpointLocation, WatchpointState};
use crate::{Address, WatchpointID, INVALID_WATCH_ID};

use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct WatchpointEntry {
    pub location: Arc<WatchpointLocation>,
    pub state: WatchpointState,
}

/// Watchpoints of one target, ordered by id.
#[derive(Debug)]
pub(crate) struct WatchpointLocationList {
    entries: BTreeMap<WatchpointID, WatchpointEntry>,
    last_id: WatchpointID,
}

impl WatchpointLocationList {
    pub(crate) fn new() -> Self {
        WatchpointLocationList {
            entries: BTreeMap::new(),
            last_id: INVALID_WATCH_ID,
        }
    }

    /// Ids are handed out in increasing order and never reused.
    pub(crate) fn next_id(&mut self) -> WatchpointID {
        self.last_id += 1;
        self.last_id
    }

    pub(crate) fn add(&mut self, location: Arc<WatchpointLocation>, state: WatchpointState) {
        self.entries.insert(location.id(), WatchpointEntry { location, state });
    }

    pub(crate) fn remove(&mut self, id: WatchpointID) -> Option<WatchpointEntry> {
        self.entries.remove(&id)
    }

    pub(crate) fn take_all(&mut self) -> Vec<WatchpointEntry> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub(crate) fn get(&self, id: WatchpointID) -> Option<&WatchpointEntry> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: WatchpointID) -> Option<&mut WatchpointEntry> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn at_index(&self, index: usize) -> Option<&WatchpointEntry> {
        self.entries.values().nth(index)
    }

    pub(crate) fn find_by_address(&self, addr: Address, size: usize) -> Option<WatchpointID> {
        self.iter()
            .find(|e| e.location.load_address() == addr && e.location.byte_size() == size)
            .map(|e| e.location.id())
    }

    pub(crate) fn ids(&self) -> Vec<WatchpointID> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &WatchpointEntry> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut WatchpointEntry> {
        self.entries.values_mut()
    }
}
