use crate::error::WatchError;
use crate::{Address, WatchpointID};

/// Bank of hardware watch registers shared by all watchpoints of a target.
#[derive(Debug)]
pub(crate) struct HardwareWatchRegisters {
    slots: Vec<Option<WatchpointID>>,
}

impl HardwareWatchRegisters {
    pub(crate) fn new(count: u32) -> Self {
        HardwareWatchRegisters {
            slots: vec![None; count as usize],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn num_free(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    /// Binds `id` to the lowest free register.
    pub(crate) fn allocate(&mut self, id: WatchpointID) -> Result<u32, WatchError> {
        match self.slots.iter().position(|s| s.is_none()) {
            Some(index) => {
                self.slots[index] = Some(id);
                Ok(index as u32)
            }
            None => Err(WatchError::NoFreeHardwareSlot),
        }
    }

    pub(crate) fn release(&mut self, index: u32) -> Option<WatchpointID> {
        self.slots.get_mut(index as usize).and_then(|s| s.take())
    }

    pub(crate) fn owner(&self, index: u32) -> Option<WatchpointID> {
        self.slots.get(index as usize).copied().flatten()
    }
}

/// Checks that a region can be covered by a single watch register.
pub(crate) fn validate_region(
    addr: Address,
    size: usize,
    max_size: u32,
    require_alignment: bool,
) -> Result<(), WatchError> {
    if addr == crate::INVALID_ADDRESS {
        return Err(WatchError::InvalidAddress);
    }
    if size == 0 || !size.is_power_of_two() || size > max_size as usize {
        return Err(WatchError::UnsupportedWatchSize(size));
    }
    if require_alignment && addr % size as Address != 0 {
        return Err(WatchError::MisalignedAddress { addr, size });
    }
    match addr.checked_add(size as Address) {
        Some(_) => Ok(()),
        None => Err(WatchError::InvalidAddress),
    }
}
