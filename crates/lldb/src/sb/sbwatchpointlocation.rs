use super::*;
use crate::target::TargetState;

/// Handle to a watchpoint owned by a target.
///
/// Clones share the same watchpoint. An empty handle, or one whose watchpoint
/// has since been deleted, answers every query with a sentinel value and never
/// touches the target's lock.
#[derive(Clone, Default)]
pub struct SBWatchpointLocation {
    location: Option<Arc<WatchpointLocation>>,
}

impl SBWatchpointLocation {
    pub fn new() -> SBWatchpointLocation {
        SBWatchpointLocation { location: None }
    }

    pub(crate) fn from_location(location: Arc<WatchpointLocation>) -> SBWatchpointLocation {
        SBWatchpointLocation {
            location: Some(location),
        }
    }

    /// Runs `f` under the owning target's API lock, if this handle still refers
    /// to a registered watchpoint.
    fn with_locked<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut TargetState, &WatchpointLocation) -> R,
    {
        let location = self.location.as_deref()?;
        let target = location.target()?;
        let mut state = target.api_lock();
        if state.watchpoint(location.id()).is_none() {
            return None;
        }
        Some(f(&mut *state, location))
    }

    pub fn id(&self) -> WatchpointID {
        let watch_id = match &self.location {
            Some(location) => location.id(),
            None => INVALID_WATCH_ID,
        };
        if watch_id == INVALID_WATCH_ID {
            debug!(target: API_LOG, "SBWatchpointLocation({:p})::id() => INVALID_WATCH_ID", self.as_ptr());
        } else {
            debug!(target: API_LOG, "SBWatchpointLocation({:p})::id() => {}", self.as_ptr(), watch_id);
        }
        watch_id
    }

    pub fn hardware_index(&self) -> i32 {
        self.with_locked(|state, location| state.watchpoint(location.id()).map(|wp| wp.hardware_index))
            .flatten()
            .unwrap_or(INVALID_HARDWARE_INDEX)
    }

    pub fn watch_address(&self) -> Address {
        self.with_locked(|_, location| location.load_address()).unwrap_or(INVALID_ADDRESS)
    }

    pub fn watch_size(&self) -> usize {
        self.with_locked(|_, location| location.byte_size()).unwrap_or(0)
    }

    pub fn watch_type(&self) -> WatchType {
        self.with_locked(|state, location| state.watchpoint(location.id()).map(|wp| wp.watch_type))
            .flatten()
            .unwrap_or_else(WatchType::empty)
    }

    /// Arms or disarms the watchpoint.
    ///
    /// Arming needs a free hardware watch register; if none is left the
    /// watchpoint stays disabled and the failure is only logged.
    pub fn set_enabled(&self, enabled: bool) {
        self.with_locked(|state, location| {
            let result = if enabled {
                state.enable_watchpoint_by_id(location.id())
            } else {
                state.disable_watchpoint_by_id(location.id())
            };
            if let Err(err) = result {
                warn!("Watchpoint {}: set_enabled({}) failed: {}", location.id(), enabled, err);
            }
        });
    }

    pub fn is_enabled(&self) -> bool {
        self.with_locked(|state, location| state.watchpoint(location.id()).map(|wp| wp.enabled))
            .flatten()
            .unwrap_or(false)
    }

    pub fn hit_count(&self) -> u32 {
        let count = self
            .with_locked(|state, location| state.watchpoint(location.id()).map(|wp| wp.hit_count))
            .flatten()
            .unwrap_or(0);
        debug!(target: API_LOG, "SBWatchpointLocation({:p})::hit_count() => {}", self.as_ptr(), count);
        count
    }

    pub fn ignore_count(&self) -> u32 {
        self.with_locked(|state, location| state.watchpoint(location.id()).map(|wp| wp.ignore_count))
            .flatten()
            .unwrap_or(0)
    }

    pub fn set_ignore_count(&self, count: u32) {
        self.with_locked(|state, location| {
            if let Err(err) = state.set_ignore_count(location.id(), count) {
                warn!("Watchpoint {}: set_ignore_count({}) failed: {}", location.id(), count, err);
            }
        });
    }

    /// Appends a description of the watchpoint to `description`, followed by a
    /// line break. An unusable handle writes "No value" instead.
    pub fn get_description(&self, description: &mut SBStream, level: DescriptionLevel) -> bool {
        let described = self.with_locked(|state, location| match state.watchpoint(location.id()) {
            Some(wp) => crate::target::describe(location, wp, level, description).is_ok(),
            None => false,
        });
        if described != Some(true) {
            let _ = fmt::Write::write_str(description, "No value");
        }
        description.eol();
        true
    }

    fn as_ptr(&self) -> *const WatchpointLocation {
        match &self.location {
            Some(location) => Arc::as_ptr(location),
            None => std::ptr::null(),
        }
    }
}

impl From<Arc<WatchpointLocation>> for SBWatchpointLocation {
    fn from(location: Arc<WatchpointLocation>) -> Self {
        let watchpoint = SBWatchpointLocation::from_location(location);
        if log::log_enabled!(target: API_LOG, log::Level::Debug) {
            let mut descr = SBStream::new();
            watchpoint.get_description(&mut descr, DescriptionLevel::Brief);
            debug!(
                target: API_LOG,
                "SBWatchpointLocation::from(location={:p}) => {}",
                watchpoint.as_ptr(),
                descr.data().trim_end()
            );
        }
        watchpoint
    }
}

impl IsValid for SBWatchpointLocation {
    fn is_valid(&self) -> bool {
        self.with_locked(|_, _| ()).is_some()
    }
}

impl fmt::Debug for SBWatchpointLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let full = f.alternate();
        debug_descr(f, |descr| {
            self.get_description(descr, if full { DescriptionLevel::Full } else { DescriptionLevel::Brief })
        })
    }
}
