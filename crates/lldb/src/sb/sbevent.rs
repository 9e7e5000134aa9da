use super::*;

use bitflags::bitflags;

#[derive(Clone)]
pub struct SBWatchpointEvent {
    event_type: WatchpointEventType,
    watchpoint: SBWatchpointLocation,
}

impl SBWatchpointEvent {
    pub fn event_type(&self) -> WatchpointEventType {
        self.event_type
    }
    pub fn watchpoint(&self) -> SBWatchpointLocation {
        self.watchpoint.clone()
    }
}

impl From<WatchpointEvent> for SBWatchpointEvent {
    fn from(event: WatchpointEvent) -> Self {
        SBWatchpointEvent {
            event_type: event.event_type,
            watchpoint: SBWatchpointLocation::from_location(event.location),
        }
    }
}

impl fmt::Debug for SBWatchpointEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} watchpoint {}", self.event_type, self.watchpoint.id())
    }
}

bitflags! {
    pub struct WatchpointEventType : u32 {
        const Added = (1 << 1);
        const Removed = (1 << 2);
        const Enabled = (1 << 6);
        const Disabled = (1 << 7);
        const IgnoreChanged = (1 << 10);
        const TypeChanged = (1 << 12);
    }
}
