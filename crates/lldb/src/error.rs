use crate::{Address, WatchpointID};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    InvalidTarget,
    InvalidAddress,
    UnsupportedWatchSize(usize),
    MisalignedAddress { addr: Address, size: usize },
    NoWatchType,
    NoFreeHardwareSlot,
    NoSuchWatchpoint(WatchpointID),
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WatchError::InvalidTarget => write!(f, "invalid target"),
            WatchError::InvalidAddress => write!(f, "invalid watch address"),
            WatchError::UnsupportedWatchSize(size) => write!(f, "watch size of {} is not supported", size),
            WatchError::MisalignedAddress { addr, size } => {
                write!(f, "address 0x{:x} is not aligned to the watch size ({})", addr, size)
            }
            WatchError::NoWatchType => write!(f, "watchpoint must watch for reads, writes, or both"),
            WatchError::NoFreeHardwareSlot => write!(f, "no unused hardware watchpoint registers left"),
            WatchError::NoSuchWatchpoint(id) => write!(f, "watchpoint {} does not exist", id),
        }
    }
}

impl std::error::Error for WatchError {}

#[test]
fn test_messages() {
    assert_eq!(WatchError::UnsupportedWatchSize(3).to_string(), "watch size of 3 is not supported");
    assert_eq!(
        WatchError::MisalignedAddress { addr: 0x1002, size: 4 }.to_string(),
        "address 0x1002 is not aligned to the watch size (4)"
    );
}
