use log::error;
use serde::de::Error as _;
use serde_derive::*;

/// Largest hardware watch-register bank a target can be configured with.
pub const MAX_HARDWARE_WATCHPOINT_SLOTS: u32 = 64;

/// Per-target tunables for watchpoint handling.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetSettings {
    /// Size of the hardware watch-register bank, at most `MAX_HARDWARE_WATCHPOINT_SLOTS`.
    pub hardware_watchpoint_slots: u32,
    /// Largest region a single register can cover.
    pub max_watch_size: u32,
    /// Reject addresses that are not a multiple of the watch size.
    pub require_alignment: bool,
    /// Undrained watchpoint events kept before the oldest are dropped.
    pub event_queue_capacity: usize,
}

impl Default for TargetSettings {
    fn default() -> Self {
        TargetSettings {
            hardware_watchpoint_slots: 4,
            max_watch_size: 8,
            require_alignment: true,
            event_queue_capacity: 256,
        }
    }
}

impl TargetSettings {
    pub fn from_json(s: &str) -> Result<TargetSettings, serde_json::Error> {
        let settings: TargetSettings = serde_json::from_str(s)?;
        if settings.hardware_watchpoint_slots > MAX_HARDWARE_WATCHPOINT_SLOTS {
            return Err(serde_json::Error::custom(format_args!(
                "hardwareWatchpointSlots: {} exceeds the maximum of {}",
                settings.hardware_watchpoint_slots, MAX_HARDWARE_WATCHPOINT_SLOTS
            )));
        }
        Ok(settings)
    }

    pub fn from_json_or_default(s: &str) -> TargetSettings {
        match TargetSettings::from_json(s) {
            Ok(settings) => settings,
            Err(err) => {
                error!("{}", err);
                Default::default()
            }
        }
    }
}
