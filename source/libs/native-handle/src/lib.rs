// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Native handle records shared across process boundaries
//! OWNERS: @runtime
//! PUBLIC API: NativeHandle, create, clone, close, delete
//! DEPENDS_ON: libc (C allocator, dup/close)
//! INVARIANTS: Header is 12 bytes; `version` equals the header size; payload is
//!             `num_fds` descriptors followed by `num_ints` integers
//!
//! A native handle is a variable-length record allocated from the C heap. The
//! primitives in this crate are the only way records are created and released,
//! so every owner must pair [`create`]/[`clone`] with [`close`] + [`delete`].

#![deny(clippy::all, missing_docs)]

use core::fmt;
use core::mem;
use core::ptr;
use core::slice;

use libc::c_int;

/// Upper bound on descriptors carried by a single record.
pub const NATIVE_HANDLE_MAX_FDS: c_int = 1024;
/// Upper bound on integers carried by a single record.
pub const NATIVE_HANDLE_MAX_INTS: c_int = 1024;

const HEADER_SIZE: usize = mem::size_of::<NativeHandle>();

const _: () = assert!(mem::size_of::<NativeHandle>() == 12);
const _: () = assert!(mem::align_of::<NativeHandle>() == mem::align_of::<c_int>());

/// Header of a native handle record; the payload follows it in the same allocation.
///
/// The slice accessors reach past the header through `&self`/`&mut self`. That is only
/// sound when a reference keeps the provenance of the whole allocation, which holds under
/// the Tree Borrows model (`MIRIFLAGS=-Zmiri-tree-borrows`) but not under Stacked Borrows.
/// The primitives in this crate ([`clone`], [`close`]) work from the caller's raw pointer
/// instead and do not depend on it.
#[repr(C)]
pub struct NativeHandle {
    version: c_int,
    num_fds: c_int,
    num_ints: c_int,
    data: [c_int; 0],
}

impl NativeHandle {
    /// Size of the header in bytes, as recorded in every well-formed record.
    pub const VERSION: c_int = HEADER_SIZE as c_int;

    /// Returns the header version stamp.
    pub fn version(&self) -> c_int {
        self.version
    }

    /// Number of file descriptors in the payload.
    pub fn num_fds(&self) -> usize {
        self.num_fds as usize
    }

    /// Number of integers following the descriptors.
    pub fn num_ints(&self) -> usize {
        self.num_ints as usize
    }

    /// Descriptors carried by the record.
    pub fn fds(&self) -> &[c_int] {
        // SAFETY: records are only produced by `create`, which sizes the allocation for
        // `num_fds + num_ints` trailing words. Relies on Tree Borrows provenance.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.num_fds()) }
    }

    /// Integers carried by the record.
    pub fn ints(&self) -> &[c_int] {
        // SAFETY: see `fds`; the integers start right after the descriptors.
        unsafe { slice::from_raw_parts(self.data.as_ptr().add(self.num_fds()), self.num_ints()) }
    }

    /// Mutable view over the descriptor slots.
    pub fn fds_mut(&mut self) -> &mut [c_int] {
        let len = self.num_fds();
        // SAFETY: see `fds`.
        unsafe { slice::from_raw_parts_mut(self.data.as_mut_ptr(), len) }
    }

    /// Mutable view over the integer slots.
    pub fn ints_mut(&mut self) -> &mut [c_int] {
        let offset = self.num_fds();
        let len = self.num_ints();
        // SAFETY: see `ints`.
        unsafe { slice::from_raw_parts_mut(self.data.as_mut_ptr().add(offset), len) }
    }
}

/// First payload word of `handle`, derived from the raw pointer so it covers the allocation.
///
/// # Safety
///
/// `handle` must point to a live record produced by [`create`].
unsafe fn payload(handle: *const NativeHandle) -> *const c_int {
    ptr::addr_of!((*handle).data).cast::<c_int>()
}

/// Mutable counterpart of [`payload`].
///
/// # Safety
///
/// Same as [`payload`], and nothing else may access the record meanwhile.
unsafe fn payload_mut(handle: *mut NativeHandle) -> *mut c_int {
    ptr::addr_of_mut!((*handle).data).cast::<c_int>()
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("version", &self.version)
            .field("fds", &self.fds())
            .field("ints", &self.ints())
            .finish()
    }
}

/// Allocates a zero-filled record with room for `num_fds` descriptors and `num_ints` integers.
///
/// Returns null when a count is negative or above its limit, or when the C allocator fails.
pub fn create(num_fds: c_int, num_ints: c_int) -> *mut NativeHandle {
    if !(0..=NATIVE_HANDLE_MAX_FDS).contains(&num_fds)
        || !(0..=NATIVE_HANDLE_MAX_INTS).contains(&num_ints)
    {
        return ptr::null_mut();
    }
    let words = (num_fds + num_ints) as usize;
    let size = HEADER_SIZE + words * mem::size_of::<c_int>();
    // SAFETY: plain C allocation; a null result is passed through to the caller.
    let raw = unsafe { libc::calloc(1, size) }.cast::<NativeHandle>();
    if raw.is_null() {
        return raw;
    }
    // SAFETY: `raw` is a fresh allocation large enough for the header.
    unsafe {
        (*raw).version = NativeHandle::VERSION;
        (*raw).num_fds = num_fds;
        (*raw).num_ints = num_ints;
    }
    raw
}

/// Produces an independent copy of `handle`, duplicating every descriptor.
///
/// Returns null for a null input or when allocation or any `dup` fails; nothing leaks on
/// the failure path.
///
/// # Safety
///
/// `handle` must be null or point to a live record produced by [`create`] or [`clone`].
pub unsafe fn clone(handle: *const NativeHandle) -> *mut NativeHandle {
    if handle.is_null() {
        return ptr::null_mut();
    }
    let (num_fds, num_ints) = ((*handle).num_fds, (*handle).num_ints);
    let copy = create(num_fds, num_ints);
    if copy.is_null() {
        return copy;
    }
    let src = payload(handle);
    let dst = payload_mut(copy);
    for i in 0..num_fds as usize {
        let dup = libc::dup(*src.add(i));
        if dup == -1 {
            // Shrink to the descriptors duplicated so far so close only touches those.
            (*copy).num_fds = i as c_int;
            close(copy);
            delete(copy);
            return ptr::null_mut();
        }
        *dst.add(i) = dup;
    }
    let offset = num_fds as usize;
    ptr::copy_nonoverlapping(src.add(offset), dst.add(offset), num_ints as usize);
    copy
}

/// Closes every descriptor held by `handle`. The record itself stays allocated.
///
/// Returns `-EINVAL` for a null handle and 0 otherwise.
///
/// # Safety
///
/// `handle` must be null or point to a live record produced by [`create`] or [`clone`].
pub unsafe fn close(handle: *const NativeHandle) -> c_int {
    if handle.is_null() {
        return -libc::EINVAL;
    }
    let fds = payload(handle);
    for i in 0..(*handle).num_fds as usize {
        libc::close(*fds.add(i));
    }
    0
}

/// Releases the record allocation. Descriptors are not closed; call [`close`] first.
///
/// Returns 0 for null or success and `-EINVAL` when the header is not a native handle.
///
/// # Safety
///
/// `handle` must be null or point to a live record produced by [`create`] or [`clone`]
/// that is not used afterwards.
pub unsafe fn delete(handle: *mut NativeHandle) -> c_int {
    if handle.is_null() {
        return 0;
    }
    if (*handle).version != NativeHandle::VERSION {
        return -libc::EINVAL;
    }
    libc::free(handle.cast());
    0
}
