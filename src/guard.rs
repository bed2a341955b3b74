//! Debug-only guard against nested entry into a container.
//!
//! Containers call user code (`Hash`, `Eq`, `Ord`, equality closures) while
//! probing. A user impl that reaches back into the same container through a
//! raw pointer would observe it mid-operation. In debug builds each public
//! entry point marks the container busy and a nested entry panics; in release
//! builds the guard is a zero-sized no-op.

use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug, Default)]
pub(crate) struct BusyFlag {
    #[cfg(debug_assertions)]
    busy: Cell<bool>,
    // Containers stay Send but !Sync in release too, same as with the flag.
    _cell: PhantomData<Cell<()>>,
}

impl BusyFlag {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            busy: Cell::new(false),
            _cell: PhantomData,
        }
    }

    /// Marks the container busy until the returned guard drops.
    ///
    /// # Panics
    /// In debug builds, panics if the container is already busy.
    #[inline]
    pub(crate) fn enter(&self) -> Busy<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.busy.replace(true),
                "reentrant call into a container while it is probing"
            );
        }
        Busy { flag: self }
    }
}

/// Clears the busy mark on drop.
pub(crate) struct Busy<'a> {
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    flag: &'a BusyFlag,
}

impl Drop for Busy<'_> {
    #[inline]
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.flag.busy.set(false);
    }
}
