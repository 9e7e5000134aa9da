#![allow(non_upper_case_globals)]

mod error;
mod settings;
mod target;

mod sb;
pub use sb::*;

pub use error::WatchError;
pub use settings::{TargetSettings, MAX_HARDWARE_WATCHPOINT_SLOTS};
pub use target::{Target, WatchpointEvent, WatchpointLocation};

use bitflags::bitflags;
use num_enum::FromPrimitive;

pub type Address = u64;
pub type WatchpointID = u32;

pub const INVALID_ADDRESS: Address = Address::MAX;
pub const INVALID_WATCH_ID: WatchpointID = 0;
pub const INVALID_HARDWARE_INDEX: i32 = -1;

// Log target for per-call tracing of the public API.
pub(crate) const API_LOG: &str = "lldb_watch::api";

bitflags! {
    pub struct WatchType : u32 {
        const Read = (1 << 0);
        const Write = (1 << 1);
    }
}

#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Debug, FromPrimitive)]
#[repr(u32)]
pub enum DescriptionLevel {
    #[default]
    Brief = 0,
    Full = 1,
    Verbose = 2,
    Initial = 3,
}

// Initialization for test binaries
#[cfg(test)]
#[ctor::ctor]
fn test_init() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}
