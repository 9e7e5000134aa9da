use super::Target;
use crate::{Address, DescriptionLevel, WatchType, WatchpointID, INVALID_HARDWARE_INDEX};

use std::fmt;
use std::sync::{Arc, Weak};

/// A watched address range registered with a target.
///
/// Only the identity of the watchpoint lives here. Everything that changes over
/// its lifetime is kept in the owning target's registry, so it can only be read
/// or modified while holding that target's API lock.
pub struct WatchpointLocation {
    id: WatchpointID,
    load_addr: Address,
    byte_size: usize,
    declaration: Option<String>,
    target: Weak<Target>,
}

impl WatchpointLocation {
    pub(crate) fn new(
        id: WatchpointID,
        load_addr: Address,
        byte_size: usize,
        declaration: Option<String>,
        target: Weak<Target>,
    ) -> Self {
        WatchpointLocation {
            id,
            load_addr,
            byte_size,
            declaration,
            target,
        }
    }

    pub fn id(&self) -> WatchpointID {
        self.id
    }

    pub fn load_address(&self) -> Address {
        self.load_addr
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }

    /// The owning target, unless it has already been destroyed.
    pub fn target(&self) -> Option<Arc<Target>> {
        self.target.upgrade()
    }

    pub(crate) fn overlaps(&self, addr: Address, size: usize) -> bool {
        let start = self.load_addr as u128;
        let end = start + self.byte_size as u128;
        let other_start = addr as u128;
        let other_end = other_start + size as u128;
        start < other_end && other_start < end
    }
}

impl fmt::Debug for WatchpointLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WatchpointLocation")
            .field("id", &self.id)
            .field("load_addr", &format_args!("0x{:x}", self.load_addr))
            .field("byte_size", &self.byte_size)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WatchpointState {
    pub watch_type: WatchType,
    pub enabled: bool,
    pub hardware_index: i32,
    pub hit_count: u32,
    pub ignore_count: u32,
}

impl WatchpointState {
    pub(crate) fn new(watch_type: WatchType) -> Self {
        WatchpointState {
            watch_type,
            enabled: false,
            hardware_index: INVALID_HARDWARE_INDEX,
            hit_count: 0,
            ignore_count: 0,
        }
    }

    /// Records one trigger and decides whether it should be reported.
    /// Triggers are absorbed while the ignore count is positive.
    pub(crate) fn should_stop(&mut self) -> bool {
        self.hit_count = self.hit_count.saturating_add(1);
        if self.ignore_count > 0 {
            self.ignore_count -= 1;
            false
        } else {
            true
        }
    }
}

pub(crate) fn describe(
    location: &WatchpointLocation,
    state: &WatchpointState,
    level: DescriptionLevel,
    out: &mut dyn fmt::Write,
) -> fmt::Result {
    write!(
        out,
        "Watchpoint {}: addr = 0x{:016x} size = {} state = {} type = {}{}",
        location.id,
        location.load_addr,
        location.byte_size,
        if state.enabled { "enabled" } else { "disabled" },
        if state.watch_type.contains(WatchType::Read) { "r" } else { "" },
        if state.watch_type.contains(WatchType::Write) { "w" } else { "" },
    )?;
    if matches!(level, DescriptionLevel::Full | DescriptionLevel::Verbose) {
        if let Some(decl) = &location.declaration {
            write!(out, "\n    declare @ '{}'", decl)?;
        }
    }
    if level == DescriptionLevel::Verbose {
        write!(
            out,
            "\n    hw_index = {}  hit_count = {:<4}  ignore_count = {:<4}",
            state.hardware_index, state.hit_count, state.ignore_count
        )?;
    }
    Ok(())
}
