mod hardware;
mod watchpoint;
mod watchpoint_list;

pub use watchpoint::WatchpointLocation;

pub(crate) use watchpoint::describe;

use crate::error::WatchError;
use crate::settings::{TargetSettings, MAX_HARDWARE_WATCHPOINT_SLOTS};
use crate::{Address, WatchType, WatchpointEventType, WatchpointID};
use hardware::HardwareWatchRegisters;
use watchpoint::WatchpointState;
use watchpoint_list::{WatchpointEntry, WatchpointLocationList};

use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A debug target, as far as its watchpoints are concerned.
///
/// Owns the single API lock that serializes every access to every watchpoint
/// of this target. The lock is not reentrant: code that already holds the
/// guard works on `&mut TargetState` directly.
pub struct Target {
    api_mutex: Mutex<TargetState>,
}

impl Target {
    pub fn new(settings: TargetSettings) -> Arc<Target> {
        debug!("Creating target with {:?}", settings);
        Arc::new(Target {
            api_mutex: Mutex::new(TargetState::new(settings)),
        })
    }

    pub fn settings(&self) -> TargetSettings {
        self.api_lock().settings.clone()
    }

    pub(crate) fn api_lock(&self) -> MutexGuard<'_, TargetState> {
        self.api_mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Watchpoint change notification queued by the registry.
#[derive(Debug, Clone)]
pub struct WatchpointEvent {
    pub event_type: WatchpointEventType,
    pub location: Arc<WatchpointLocation>,
}

pub(crate) struct TargetState {
    settings: TargetSettings,
    watchpoints: WatchpointLocationList,
    hardware: HardwareWatchRegisters,
    events: VecDeque<WatchpointEvent>,
}

impl TargetState {
    fn new(mut settings: TargetSettings) -> Self {
        if settings.hardware_watchpoint_slots > MAX_HARDWARE_WATCHPOINT_SLOTS {
            warn!(
                "hardware_watchpoint_slots = {} is too large, using {}",
                settings.hardware_watchpoint_slots, MAX_HARDWARE_WATCHPOINT_SLOTS
            );
            settings.hardware_watchpoint_slots = MAX_HARDWARE_WATCHPOINT_SLOTS;
        }
        TargetState {
            hardware: HardwareWatchRegisters::new(settings.hardware_watchpoint_slots),
            watchpoints: WatchpointLocationList::new(),
            events: VecDeque::new(),
            settings,
        }
    }

    pub(crate) fn watchpoint(&self, id: WatchpointID) -> Option<&WatchpointState> {
        self.watchpoints.get(id).map(|e| &e.state)
    }

    pub(crate) fn location(&self, id: WatchpointID) -> Option<&Arc<WatchpointLocation>> {
        self.watchpoints.get(id).map(|e| &e.location)
    }

    pub(crate) fn num_watchpoints(&self) -> usize {
        self.watchpoints.len()
    }

    pub(crate) fn watchpoint_at_index(&self, index: usize) -> Option<&Arc<WatchpointLocation>> {
        self.watchpoints.at_index(index).map(|e| &e.location)
    }

    pub(crate) fn num_free_hardware_slots(&self) -> usize {
        self.hardware.num_free()
    }

    /// Registers a watchpoint on `[addr, addr + size)` and arms it.
    ///
    /// Watching a region that is already watched updates the existing
    /// watchpoint's type and re-arms it instead of creating a second one.
    /// The existing watchpoint keeps the declaration it was created with.
    pub(crate) fn create_watchpoint(
        &mut self,
        target: Weak<Target>,
        addr: Address,
        size: usize,
        watch_type: WatchType,
        declaration: Option<&str>,
    ) -> Result<Arc<WatchpointLocation>, WatchError> {
        if watch_type.is_empty() {
            return Err(WatchError::NoWatchType);
        }
        hardware::validate_region(addr, size, self.settings.max_watch_size, self.settings.require_alignment)?;

        if let Some(id) = self.watchpoints.find_by_address(addr, size) {
            let entry = self.watchpoints.get_mut(id).ok_or(WatchError::NoSuchWatchpoint(id))?;
            let location = entry.location.clone();
            if entry.state.watch_type != watch_type {
                debug!("Watchpoint {}: type {:?} -> {:?}", id, entry.state.watch_type, watch_type);
                entry.state.watch_type = watch_type;
                self.broadcast(WatchpointEventType::TypeChanged, &location);
            }
            if declaration.is_some() && declaration != location.declaration() {
                debug!("Watchpoint {}: keeping declaration {:?}", id, location.declaration());
            }
            self.enable_watchpoint_by_id(id)?;
            return Ok(location);
        }

        if self.hardware.num_free() == 0 {
            return Err(WatchError::NoFreeHardwareSlot);
        }
        let id = self.watchpoints.next_id();
        let hw_index = self.hardware.allocate(id)?;
        let location = Arc::new(WatchpointLocation::new(
            id,
            addr,
            size,
            declaration.map(Into::into),
            target,
        ));
        let mut state = WatchpointState::new(watch_type);
        state.enabled = true;
        state.hardware_index = hw_index as i32;
        self.watchpoints.add(location.clone(), state);
        debug!("Watchpoint {} created at 0x{:x}+{} in slot {}", id, addr, size, hw_index);
        self.broadcast(WatchpointEventType::Added, &location);
        Ok(location)
    }

    pub(crate) fn enable_watchpoint_by_id(&mut self, id: WatchpointID) -> Result<(), WatchError> {
        let entry = self.watchpoints.get_mut(id).ok_or(WatchError::NoSuchWatchpoint(id))?;
        if entry.state.enabled {
            return Ok(());
        }
        let hw_index = self.hardware.allocate(id)?;
        entry.state.enabled = true;
        entry.state.hardware_index = hw_index as i32;
        let location = entry.location.clone();
        debug!("Watchpoint {} enabled in slot {}", id, hw_index);
        self.broadcast(WatchpointEventType::Enabled, &location);
        Ok(())
    }

    pub(crate) fn disable_watchpoint_by_id(&mut self, id: WatchpointID) -> Result<(), WatchError> {
        let entry = self.watchpoints.get_mut(id).ok_or(WatchError::NoSuchWatchpoint(id))?;
        if !entry.state.enabled {
            return Ok(());
        }
        Self::unbind(&mut self.hardware, entry);
        let location = entry.location.clone();
        debug!("Watchpoint {} disabled", id);
        self.broadcast(WatchpointEventType::Disabled, &location);
        Ok(())
    }

    /// Enables every watchpoint that can still get a hardware register.
    /// Returns the first failure, after trying all of them.
    pub(crate) fn enable_all_watchpoints(&mut self) -> Result<(), WatchError> {
        let mut result = Ok(());
        for id in self.watchpoints.ids() {
            if let Err(err) = self.enable_watchpoint_by_id(id) {
                warn!("Could not enable watchpoint {}: {}", id, err);
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }

    pub(crate) fn disable_all_watchpoints(&mut self) {
        for id in self.watchpoints.ids() {
            // Ids come from the list itself, so this cannot miss.
            let _ = self.disable_watchpoint_by_id(id);
        }
    }

    pub(crate) fn remove_watchpoint_by_id(&mut self, id: WatchpointID) -> Result<(), WatchError> {
        let mut entry = self.watchpoints.remove(id).ok_or(WatchError::NoSuchWatchpoint(id))?;
        Self::unbind(&mut self.hardware, &mut entry);
        debug!("Watchpoint {} removed", id);
        self.broadcast(WatchpointEventType::Removed, &entry.location);
        Ok(())
    }

    pub(crate) fn remove_all_watchpoints(&mut self) -> usize {
        let entries = self.watchpoints.take_all();
        let count = entries.len();
        for mut entry in entries {
            Self::unbind(&mut self.hardware, &mut entry);
            self.broadcast(WatchpointEventType::Removed, &entry.location);
        }
        debug!("Removed {} watchpoints", count);
        count
    }

    pub(crate) fn set_ignore_count(&mut self, id: WatchpointID, count: u32) -> Result<(), WatchError> {
        let entry = self.watchpoints.get_mut(id).ok_or(WatchError::NoSuchWatchpoint(id))?;
        if entry.state.ignore_count == count {
            return Ok(());
        }
        entry.state.ignore_count = count;
        let location = entry.location.clone();
        self.broadcast(WatchpointEventType::IgnoreChanged, &location);
        Ok(())
    }

    /// Delivers a memory access reported by the process layer.
    /// Returns the watchpoints whose hit should be surfaced to the user.
    pub(crate) fn handle_memory_access(
        &mut self,
        addr: Address,
        size: usize,
        access: WatchType,
    ) -> Vec<Arc<WatchpointLocation>> {
        let mut stopped = vec![];
        for entry in self.watchpoints.iter_mut() {
            if entry.state.enabled
                && entry.state.watch_type.intersects(access)
                && entry.location.overlaps(addr, size)
            {
                if entry.state.should_stop() {
                    stopped.push(entry.location.clone());
                } else {
                    debug!(
                        "Watchpoint {} hit ignored, {} more to ignore",
                        entry.location.id(),
                        entry.state.ignore_count
                    );
                }
            }
        }
        stopped
    }

    /// Delivers a trap raised by hardware watch register `hw_index`.
    pub(crate) fn handle_hardware_trap(&mut self, hw_index: u32) -> Option<Arc<WatchpointLocation>> {
        let Some(id) = self.hardware.owner(hw_index) else {
            warn!("Trap from unbound hardware watch register {} of {}", hw_index, self.hardware.len());
            return None;
        };
        let entry = self.watchpoints.get_mut(id)?;
        if entry.state.should_stop() {
            Some(entry.location.clone())
        } else {
            None
        }
    }

    pub(crate) fn take_events(&mut self) -> Vec<WatchpointEvent> {
        self.events.drain(..).collect()
    }

    fn unbind(hardware: &mut HardwareWatchRegisters, entry: &mut WatchpointEntry) {
        if entry.state.hardware_index >= 0 {
            hardware.release(entry.state.hardware_index as u32);
        }
        entry.state.enabled = false;
        entry.state.hardware_index = crate::INVALID_HARDWARE_INDEX;
    }

    fn broadcast(&mut self, event_type: WatchpointEventType, location: &Arc<WatchpointLocation>) {
        if self.settings.event_queue_capacity == 0 {
            return;
        }
        if self.events.len() >= self.settings.event_queue_capacity {
            if let Some(dropped) = self.events.pop_front() {
                warn!("Watchpoint event queue full, dropping {:?}", dropped.event_type);
            }
        }
        self.events.push_back(WatchpointEvent {
            event_type,
            location: location.clone(),
        });
    }

    /// Every bound register is owned by an enabled watchpoint that knows its slot.
    #[cfg(test)]
    pub(crate) fn check_hardware_accounting(&self) -> bool {
        let mut bound = 0;
        for entry in self.watchpoints.iter() {
            match (entry.state.enabled, entry.state.hardware_index) {
                (true, index) if index >= 0 => {
                    if self.hardware.owner(index as u32) != Some(entry.location.id()) {
                        return false;
                    }
                    bound += 1;
                }
                (false, crate::INVALID_HARDWARE_INDEX) => {}
                _ => return false,
            }
        }
        bound + self.hardware.num_free() == self.hardware.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_matches(($e:expr, $p:pat) => { let e = $e; assert!(matches!(e, $p), "{:?} !~ {}", e, stringify!($p)) });

    fn target_with_slots(slots: u32) -> Arc<Target> {
        Target::new(TargetSettings {
            hardware_watchpoint_slots: slots,
            ..Default::default()
        })
    }

    fn watch(target: &Arc<Target>, addr: Address, size: usize) -> Result<Arc<WatchpointLocation>, WatchError> {
        target
            .api_lock()
            .create_watchpoint(Arc::downgrade(target), addr, size, WatchType::Write, None)
    }

    #[test]
    fn test_create_binds_hardware() {
        let target = target_with_slots(2);
        let a = watch(&target, 0x1000, 4).unwrap();
        let b = watch(&target, 0x2000, 8).unwrap();
        assert_eq!((a.id(), b.id()), (1, 2));

        let state = target.api_lock();
        assert_eq!(state.watchpoint(1).map(|s| (s.enabled, s.hardware_index)), Some((true, 0)));
        assert_eq!(state.watchpoint(2).map(|s| (s.enabled, s.hardware_index)), Some((true, 1)));
        assert!(state.check_hardware_accounting());
    }

    #[test]
    fn test_create_fails_when_bank_exhausted() {
        let target = target_with_slots(1);
        watch(&target, 0x1000, 4).unwrap();
        assert_matches!(watch(&target, 0x2000, 4), Err(WatchError::NoFreeHardwareSlot));
        assert_eq!(target.api_lock().num_watchpoints(), 1);
    }

    #[test]
    fn test_create_rejects_bad_requests() {
        let target = target_with_slots(4);
        assert_matches!(watch(&target, 0x1001, 4), Err(WatchError::MisalignedAddress { .. }));
        assert_matches!(watch(&target, 0x1000, 12), Err(WatchError::UnsupportedWatchSize(12)));
        let no_type = target
            .api_lock()
            .create_watchpoint(Arc::downgrade(&target), 0x1000, 4, WatchType::empty(), None);
        assert_matches!(no_type, Err(WatchError::NoWatchType));
        assert_eq!(target.api_lock().num_watchpoints(), 0);
        assert_eq!(target.api_lock().num_free_hardware_slots(), 4);
    }

    #[test]
    fn test_same_region_updates_type() {
        let target = target_with_slots(4);
        let a = watch(&target, 0x1000, 4).unwrap();
        let b = target
            .api_lock()
            .create_watchpoint(Arc::downgrade(&target), 0x1000, 4, WatchType::Read, None)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let mut state = target.api_lock();
        assert_eq!(state.num_watchpoints(), 1);
        assert_eq!(state.watchpoint(a.id()).map(|s| s.watch_type), Some(WatchType::Read));
        let events: Vec<_> = state.take_events().into_iter().map(|e| e.event_type).collect();
        assert_eq!(events, vec![WatchpointEventType::Added, WatchpointEventType::TypeChanged]);
    }

    #[test]
    fn test_same_region_rearms_disabled_watchpoint() {
        let target = target_with_slots(1);
        let a = target
            .api_lock()
            .create_watchpoint(Arc::downgrade(&target), 0x1000, 4, WatchType::Write, Some("a.c:1"))
            .unwrap();
        target.api_lock().disable_watchpoint_by_id(a.id()).unwrap();

        let again = target
            .api_lock()
            .create_watchpoint(Arc::downgrade(&target), 0x1000, 4, WatchType::Write, Some("a.c:2"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        assert_eq!(again.declaration(), Some("a.c:1"));
        let mut state = target.api_lock();
        assert_eq!(state.watchpoint(a.id()).map(|s| (s.enabled, s.hardware_index)), Some((true, 0)));
        assert!(state.check_hardware_accounting());

        // With the only register taken by someone else, re-watching reports it.
        state.disable_watchpoint_by_id(a.id()).unwrap();
        drop(state);
        let b = watch(&target, 0x2000, 4).unwrap();
        assert_matches!(watch(&target, 0x1000, 4), Err(WatchError::NoFreeHardwareSlot));
        let state = target.api_lock();
        assert_eq!(state.num_watchpoints(), 2);
        assert_eq!(state.watchpoint(a.id()).map(|s| s.enabled), Some(false));
        assert_eq!(state.watchpoint(b.id()).map(|s| s.hardware_index), Some(0));
    }

    #[test]
    fn test_oversized_register_bank_is_capped() {
        let target = target_with_slots(u32::MAX);
        assert_eq!(target.settings().hardware_watchpoint_slots, MAX_HARDWARE_WATCHPOINT_SLOTS);
        assert_eq!(
            target.api_lock().num_free_hardware_slots(),
            MAX_HARDWARE_WATCHPOINT_SLOTS as usize
        );
    }

    #[test]
    fn test_disable_frees_slot_for_others() {
        let target = target_with_slots(1);
        let a = watch(&target, 0x1000, 4).unwrap();
        let mut state = target.api_lock();
        state.disable_watchpoint_by_id(a.id()).unwrap();
        assert_eq!(state.watchpoint(a.id()).map(|s| s.hardware_index), Some(-1));
        drop(state);

        let b = watch(&target, 0x2000, 4).unwrap();
        let mut state = target.api_lock();
        assert_eq!(state.enable_watchpoint_by_id(a.id()), Err(WatchError::NoFreeHardwareSlot));
        assert_eq!(state.watchpoint(a.id()).map(|s| s.enabled), Some(false));

        state.remove_watchpoint_by_id(b.id()).unwrap();
        state.enable_watchpoint_by_id(a.id()).unwrap();
        assert_eq!(state.watchpoint(a.id()).map(|s| s.hardware_index), Some(0));
        assert!(state.check_hardware_accounting());
    }

    #[test]
    fn test_enable_disable_all() {
        let target = target_with_slots(2);
        for addr in [0x1000, 0x2000] {
            watch(&target, addr, 8).unwrap();
        }
        let mut state = target.api_lock();
        state.disable_all_watchpoints();
        assert_eq!(state.num_free_hardware_slots(), 2);
        state.enable_all_watchpoints().unwrap();
        assert_eq!(state.num_free_hardware_slots(), 0);
        assert!(state.check_hardware_accounting());
        assert_eq!(state.remove_all_watchpoints(), 2);
        assert_eq!(state.num_free_hardware_slots(), 2);
        assert_eq!(state.remove_watchpoint_by_id(1), Err(WatchError::NoSuchWatchpoint(1)));
    }

    #[test]
    fn test_memory_access_respects_type_and_ignore_count() {
        let target = target_with_slots(4);
        let wp = watch(&target, 0x1000, 4).unwrap();
        let mut state = target.api_lock();
        state.set_ignore_count(wp.id(), 1).unwrap();

        assert!(state.handle_memory_access(0x1000, 4, WatchType::Read).is_empty());
        assert_eq!(state.watchpoint(wp.id()).map(|s| s.hit_count), Some(0));

        assert!(state.handle_memory_access(0x1002, 1, WatchType::Write).is_empty());
        let stopped = state.handle_memory_access(0x1002, 1, WatchType::Write);
        assert_eq!(stopped.len(), 1);
        assert_eq!(
            state.watchpoint(wp.id()).map(|s| (s.hit_count, s.ignore_count)),
            Some((2, 0))
        );

        state.disable_watchpoint_by_id(wp.id()).unwrap();
        assert!(state.handle_memory_access(0x1000, 4, WatchType::Write).is_empty());
        assert_eq!(state.watchpoint(wp.id()).map(|s| s.hit_count), Some(2));
    }

    #[test]
    fn test_hardware_trap() {
        let target = target_with_slots(4);
        let _a = watch(&target, 0x1000, 4).unwrap();
        let b = watch(&target, 0x2000, 4).unwrap();
        let mut state = target.api_lock();
        assert_eq!(state.handle_hardware_trap(1).map(|l| l.id()), Some(b.id()));
        assert!(state.handle_hardware_trap(3).is_none());
        assert!(state.handle_hardware_trap(99).is_none());
        assert_eq!(state.watchpoint(b.id()).map(|s| s.hit_count), Some(1));
    }

    #[test]
    fn test_event_queue_bounded() {
        let target = Target::new(TargetSettings {
            event_queue_capacity: 2,
            ..Default::default()
        });
        let wp = watch(&target, 0x1000, 4).unwrap();
        let mut state = target.api_lock();
        state.disable_watchpoint_by_id(wp.id()).unwrap();
        state.enable_watchpoint_by_id(wp.id()).unwrap();
        let events: Vec<_> = state.take_events().into_iter().map(|e| e.event_type).collect();
        assert_eq!(events, vec![WatchpointEventType::Disabled, WatchpointEventType::Enabled]);
        assert!(state.take_events().is_empty());
    }
}
