// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pointer slot that occupies 8 bytes on every target so the value-type layout does
//! not change between 32- and 64-bit processes.

use core::fmt;
use core::mem;

#[repr(C)]
pub(crate) union HidlPointer<T> {
    ptr: *const T,
    _pad: u64,
}

const _: () = assert!(mem::size_of::<HidlPointer<u8>>() == 8);
const _: () = assert!(mem::align_of::<HidlPointer<u8>>() == 8);

impl<T> HidlPointer<T> {
    pub(crate) fn new(ptr: *const T) -> Self {
        // Zero the full slot first so the upper half is defined on 32-bit targets.
        let mut slot = Self { _pad: 0 };
        slot.ptr = ptr;
        slot
    }

    pub(crate) fn get(&self) -> *const T {
        // SAFETY: `ptr` is the only field ever written after construction.
        unsafe { self.ptr }
    }
}

impl<T> Clone for HidlPointer<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for HidlPointer<T> {}

impl<T> fmt::Debug for HidlPointer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.get(), f)
    }
}
