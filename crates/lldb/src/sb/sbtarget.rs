use super::*;

#[derive(Clone, Default)]
pub struct SBTarget {
    target: Option<Arc<Target>>,
}

impl SBTarget {
    pub fn new() -> SBTarget {
        SBTarget { target: None }
    }
    pub fn create(settings: TargetSettings) -> SBTarget {
        SBTarget {
            target: Some(Target::new(settings)),
        }
    }
    pub fn settings(&self) -> Option<TargetSettings> {
        self.target.as_ref().map(|target| target.settings())
    }
    pub fn watch_address(
        &self,
        addr: Address,
        size: usize,
        read: bool,
        write: bool,
    ) -> Result<SBWatchpointLocation, SBError> {
        self.create_watchpoint(addr, size, read, write, None)
    }
    /// Like `watch_address`, also recording where the watched variable was declared.
    pub fn watch_address_with_declaration(
        &self,
        addr: Address,
        size: usize,
        read: bool,
        write: bool,
        declaration: &str,
    ) -> Result<SBWatchpointLocation, SBError> {
        self.create_watchpoint(addr, size, read, write, Some(declaration))
    }
    fn create_watchpoint(
        &self,
        addr: Address,
        size: usize,
        read: bool,
        write: bool,
        declaration: Option<&str>,
    ) -> Result<SBWatchpointLocation, SBError> {
        let target = self.target.as_ref().ok_or(WatchError::InvalidTarget)?;
        let mut watch_type = WatchType::empty();
        watch_type.set(WatchType::Read, read);
        watch_type.set(WatchType::Write, write);

        let location = {
            let mut state = target.api_lock();
            state.create_watchpoint(Arc::downgrade(target), addr, size, watch_type, declaration)
        };
        match location {
            Ok(location) => Ok(SBWatchpointLocation::from(location)),
            Err(err) => {
                debug!("Could not watch 0x{:x}+{}: {}", addr, size, err);
                Err(err.into())
            }
        }
    }
    pub fn find_watchpoint_by_id(&self, id: WatchpointID) -> Option<SBWatchpointLocation> {
        let target = self.target.as_ref()?;
        let location = target.api_lock().location(id).cloned();
        location.map(SBWatchpointLocation::from_location)
    }
    pub fn num_watchpoints(&self) -> u32 {
        match &self.target {
            Some(target) => target.api_lock().num_watchpoints() as u32,
            None => 0,
        }
    }
    pub fn watchpoint_at_index(&self, index: u32) -> SBWatchpointLocation {
        let location = match &self.target {
            Some(target) => target.api_lock().watchpoint_at_index(index as usize).cloned(),
            None => None,
        };
        match location {
            Some(location) => SBWatchpointLocation::from_location(location),
            None => SBWatchpointLocation::new(),
        }
    }
    pub fn watchpoints<'a>(&'a self) -> impl Iterator<Item = SBWatchpointLocation> + 'a {
        SBIterator::new(self.num_watchpoints(), move |index| self.watchpoint_at_index(index))
    }
    pub fn delete_watchpoint(&self, id: WatchpointID) -> bool {
        self.with_state(|state| state.remove_watchpoint_by_id(id).is_ok()).unwrap_or(false)
    }
    pub fn delete_all_watchpoints(&self) -> bool {
        self.with_state(|state| {
            state.remove_all_watchpoints();
        })
        .is_some()
    }
    pub fn enable_all_watchpoints(&self) -> bool {
        self.with_state(|state| state.enable_all_watchpoints().is_ok()).unwrap_or(false)
    }
    pub fn disable_all_watchpoints(&self) -> bool {
        self.with_state(|state| state.disable_all_watchpoints()).is_some()
    }
    pub fn num_free_hardware_watchpoints(&self) -> u32 {
        self.with_state(|state| state.num_free_hardware_slots() as u32).unwrap_or(0)
    }
    /// Reports a memory access observed by the process layer.
    /// Returns the watchpoints that want the process to stop.
    pub fn handle_memory_access(&self, addr: Address, size: usize, access: WatchType) -> Vec<SBWatchpointLocation> {
        let stopped = self
            .with_state(|state| state.handle_memory_access(addr, size, access))
            .unwrap_or_default();
        stopped.into_iter().map(SBWatchpointLocation::from_location).collect()
    }
    /// Reports a trap raised by hardware watch register `hw_index`.
    pub fn handle_hardware_trap(&self, hw_index: u32) -> Option<SBWatchpointLocation> {
        self.with_state(|state| state.handle_hardware_trap(hw_index))
            .flatten()
            .map(SBWatchpointLocation::from_location)
    }
    pub fn take_watchpoint_events(&self) -> Vec<SBWatchpointEvent> {
        let events = self.with_state(|state| state.take_events()).unwrap_or_default();
        events.into_iter().map(SBWatchpointEvent::from).collect()
    }
    pub fn get_description(&self, description: &mut SBStream, level: DescriptionLevel) -> bool {
        use std::fmt::Write;

        if !self.is_valid() {
            let _ = write!(description, "No value");
            description.eol();
            return true;
        }
        let num_watchpoints = self.num_watchpoints();
        let _ = write!(description, "Target: {} watchpoints", num_watchpoints);
        if level != DescriptionLevel::Brief {
            for wp in self.watchpoints() {
                description.eol();
                let _ = write!(description, "  ");
                wp.get_description(description, level);
            }
        }
        description.eol();
        true
    }

    fn with_state<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut crate::target::TargetState) -> R,
    {
        let target = self.target.as_ref()?;
        let mut state = target.api_lock();
        Some(f(&mut *state))
    }
}

impl From<Arc<Target>> for SBTarget {
    fn from(target: Arc<Target>) -> Self {
        SBTarget { target: Some(target) }
    }
}

impl IsValid for SBTarget {
    fn is_valid(&self) -> bool {
        self.target.is_some()
    }
}

impl fmt::Debug for SBTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let full = f.alternate();
        debug_descr(f, |descr| {
            self.get_description(descr, if full { DescriptionLevel::Full } else { DescriptionLevel::Brief })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_matches(($e:expr, $p:pat) => { let e = $e; assert!(matches!(e, $p), "{:?} !~ {}", e, stringify!($p)) });

    #[test]
    fn test_empty_target() {
        let target = SBTarget::new();
        assert!(!target.is_valid());
        assert_eq!(target.num_watchpoints(), 0);
        assert!(!target.watchpoint_at_index(0).is_valid());
        assert!(target.find_watchpoint_by_id(1).is_none());
        assert!(!target.delete_watchpoint(1));
        assert!(!target.delete_all_watchpoints());
        assert!(target.handle_memory_access(0x1000, 4, WatchType::Write).is_empty());
        let err = target.watch_address(0x1000, 4, false, true).unwrap_err();
        assert_matches!(err.error(), Some(WatchError::InvalidTarget));
        assert_eq!(err.to_string(), "invalid target");
        assert_eq!(format!("{:?}", target), "No value");
    }

    #[test]
    fn test_watch_address_errors() {
        let target = SBTarget::create(TargetSettings::default());
        let err = target.watch_address(0x1000, 4, false, false).unwrap_err();
        assert_matches!(err.error(), Some(WatchError::NoWatchType));
        let err = target.watch_address(0x1001, 2, true, false).unwrap_err();
        assert!(err.is_failure());
        assert_eq!(err.to_string(), "address 0x1001 is not aligned to the watch size (2)");
        assert_eq!(target.num_watchpoints(), 0);
    }

    #[test]
    fn test_iterate_and_delete() {
        let target = SBTarget::create(TargetSettings::default());
        for addr in [0x1000, 0x2000, 0x3000] {
            target.watch_address(addr, 8, true, true).unwrap();
        }
        let ids: Vec<_> = target.watchpoints().map(|wp| wp.id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert!(target.delete_watchpoint(2));
        assert!(!target.delete_watchpoint(2));
        let addrs: Vec<_> = target.watchpoints().map(|wp| wp.watch_address()).collect();
        assert_eq!(addrs, vec![0x1000, 0x3000]);
        assert_eq!(target.find_watchpoint_by_id(3).map(|wp| wp.watch_address()), Some(0x3000));

        assert!(target.delete_all_watchpoints());
        assert_eq!(target.num_watchpoints(), 0);
        assert_eq!(target.num_free_hardware_watchpoints(), 4);
    }

    #[test]
    fn test_enable_disable_all() {
        let target = SBTarget::create(TargetSettings {
            hardware_watchpoint_slots: 2,
            ..Default::default()
        });
        let a = target.watch_address(0x1000, 4, false, true).unwrap();
        let b = target.watch_address(0x2000, 4, false, true).unwrap();
        assert!(target.disable_all_watchpoints());
        assert!(!a.is_enabled() && !b.is_enabled());
        assert_eq!(target.num_free_hardware_watchpoints(), 2);
        assert!(target.enable_all_watchpoints());
        assert!(a.is_enabled() && b.is_enabled());
    }

    #[test]
    fn test_events() {
        let target = SBTarget::create(TargetSettings::default());
        let wp = target.watch_address(0x1000, 4, false, true).unwrap();
        wp.set_ignore_count(2);
        wp.set_enabled(false);
        target.delete_watchpoint(wp.id());

        let events: Vec<_> = target.take_watchpoint_events().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            events,
            vec![
                WatchpointEventType::Added,
                WatchpointEventType::IgnoreChanged,
                WatchpointEventType::Disabled,
                WatchpointEventType::Removed,
            ]
        );
        assert!(target.take_watchpoint_events().is_empty());
    }

    #[test]
    fn test_description() {
        let target = SBTarget::create(TargetSettings::default());
        target.watch_address_with_declaration(0x1000, 4, true, false, "main.c:3").unwrap();
        assert_eq!(format!("{:?}", target), "Target: 1 watchpoints");

        let mut descr = SBStream::new();
        target.get_description(&mut descr, DescriptionLevel::Full);
        assert_eq!(
            descr.data(),
            "Target: 1 watchpoints\n  Watchpoint 1: addr = 0x0000000000001000 size = 4 state = enabled type = r\n    declare @ 'main.c:3'\n"
        );
    }
}
