use crate::*;

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

struct SBIterator<Item, GetItem>
where
    GetItem: FnMut(u32) -> Item,
{
    size: u32,
    get_item: GetItem,
    index: u32,
}

impl<Item, GetItem> SBIterator<Item, GetItem>
where
    GetItem: FnMut(u32) -> Item,
{
    fn new(size: u32, get_item: GetItem) -> Self {
        Self {
            size: size,
            get_item: get_item,
            index: 0,
        }
    }
}

impl<Item, GetItem> Iterator for SBIterator<Item, GetItem>
where
    GetItem: FnMut(u32) -> Item,
{
    type Item = Item;
    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.size {
            self.index += 1;
            Some((self.get_item)(self.index - 1))
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        return (0, Some(self.size as usize));
    }
}

pub trait IsValid {
    fn is_valid(&self) -> bool;

    /// If `self.is_valid()` is `true`, returns `Some(self)`, otherwise `None`.
    fn check(self) -> Option<Self>
    where
        Self: Sized,
    {
        if self.is_valid() {
            Some(self)
        } else {
            None
        }
    }
}

fn debug_descr<F>(f: &mut fmt::Formatter, describe: F) -> fmt::Result
where
    F: FnOnce(&mut SBStream) -> bool,
{
    let mut descr = SBStream::new();
    if describe(&mut descr) {
        f.write_str(descr.data().trim_end())
    } else {
        Ok(())
    }
}

mod sberror;
mod sbevent;
mod sbstream;
mod sbtarget;
mod sbwatchpointlocation;

pub use sberror::*;
pub use sbevent::*;
pub use sbstream::*;
pub use sbtarget::*;
pub use sbwatchpointlocation::*;
