// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Own-or-borrow wrapper around native handle records
//! OWNERS: @runtime
//! PUBLIC API: HidlHandle
//! INVARIANTS:
//!   - An owned record came from `native_handle::clone` or was handed over via `set_to`
//!   - Dropping an owned, non-null record closes its descriptors and deletes it, once
//!   - Copies always clone; moves transfer ownership and leave the source null
//!   - Layout is {8-byte pointer slot, bool owns_handle}, 16 bytes total

use core::fmt;
use core::mem;
use core::ptr;

use native_handle::NativeHandle;

use crate::pointer::HidlPointer;
use crate::string::Ownership;

/// Native handle reference passed across HIDL interfaces.
///
/// A handle built from a raw record borrows it; the caller keeps the record alive and
/// releases it. Cloning a non-null handle produces a fully independent record (with
/// duplicated descriptors) owned by the clone.
#[repr(C)]
pub struct HidlHandle {
    handle: HidlPointer<NativeHandle>,
    owns_handle: bool,
}

const _: () = assert!(mem::size_of::<HidlHandle>() == 16);
const _: () = assert!(mem::offset_of!(HidlHandle, handle) == 0);
const _: () = assert!(mem::offset_of!(HidlHandle, owns_handle) == 8);

// SAFETY: an owned record has a single responsible value, and borrowed records are only
// read. Mutation of the wrapper requires `&mut`.
unsafe impl Send for HidlHandle {}
unsafe impl Sync for HidlHandle {}

impl HidlHandle {
    /// Creates a null, non-owning handle.
    pub fn new() -> Self {
        Self { handle: HidlPointer::new(ptr::null()), owns_handle: false }
    }

    /// Wraps `handle` without taking ownership.
    ///
    /// # Safety
    ///
    /// `handle` must be null or point to a live record that outlives this value and
    /// every value it is moved into.
    pub unsafe fn from_raw(handle: *const NativeHandle) -> Self {
        Self { handle: HidlPointer::new(handle), owns_handle: false }
    }

    /// Releases the current record (if owned) and borrows `handle` instead.
    ///
    /// # Safety
    ///
    /// Same contract as [`HidlHandle::from_raw`].
    pub unsafe fn assign_raw(&mut self, handle: *const NativeHandle) {
        self.free_handle();
        self.handle = HidlPointer::new(handle);
        self.owns_handle = false;
    }

    /// Releases the current record (if owned) and adopts `handle`.
    ///
    /// With `should_own == true` the record, including its descriptors, now belongs to
    /// this value and is closed and deleted when it is released.
    ///
    /// # Safety
    ///
    /// `handle` must be null or point to a live record. When `should_own` is true it must
    /// have been produced by [`native_handle::create`] or [`native_handle::clone`] and no
    /// other party may release it; otherwise it must outlive this value.
    pub unsafe fn set_to(&mut self, handle: *mut NativeHandle, should_own: bool) {
        self.free_handle();
        self.handle = HidlPointer::new(handle.cast_const());
        self.owns_handle = should_own;
    }

    /// Moves the record out, leaving this value null and non-owning.
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Raw view of the record; null when empty.
    pub fn get_native_handle(&self) -> *const NativeHandle {
        self.handle.get()
    }

    /// Borrowed view of the record for field access.
    pub fn as_native_handle(&self) -> Option<&NativeHandle> {
        // SAFETY: non-null pointers refer to live records, either owned by us or kept
        // alive by the borrower's contract.
        unsafe { self.handle.get().as_ref() }
    }

    /// Returns `true` when no record is attached.
    pub fn is_null(&self) -> bool {
        self.handle.get().is_null()
    }

    /// Reports whether the record is released by this value.
    pub fn ownership(&self) -> Ownership {
        if self.owns_handle {
            Ownership::Owned
        } else {
            Ownership::Borrowed
        }
    }

    fn free_handle(&mut self) {
        let handle = self.handle.get();
        if self.owns_handle && !handle.is_null() {
            // Owned records were cloned by us or handed over as `*mut` through `set_to`.
            let handle = handle.cast_mut();
            // SAFETY: the record is owned, live, and released exactly once.
            unsafe {
                native_handle::close(handle);
                native_handle::delete(handle);
            }
            self.handle = HidlPointer::new(ptr::null());
        }
        self.owns_handle = false;
    }
}

impl Default for HidlHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HidlHandle {
    fn drop(&mut self) {
        self.free_handle();
    }
}

impl Clone for HidlHandle {
    fn clone(&self) -> Self {
        let source = self.handle.get();
        if source.is_null() {
            return Self::new();
        }
        // SAFETY: `source` is live for as long as `self` is.
        let copy = unsafe { native_handle::clone(source) };
        if copy.is_null() {
            fatal!("Failed to clone native_handle in hidl_handle.");
        }
        Self { handle: HidlPointer::new(copy.cast_const()), owns_handle: true }
    }
}

impl fmt::Debug for HidlHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidlHandle")
            .field("handle", &self.as_native_handle())
            .field("owns_handle", &self.owns_handle)
            .finish()
    }
}
