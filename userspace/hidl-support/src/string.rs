// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Wire-compatible byte string with own-or-borrow storage
//! OWNERS: @runtime
//! PUBLIC API: HidlString, Ownership, empty_sentinel()
//! INVARIANTS:
//!   - Owned buffers come from the C allocator and hold a NUL at `size`
//!   - `size == 0` implies the buffer is the shared empty sentinel and not owned
//!   - `size` fits in 32 bits; larger inputs abort
//!   - Layout is {8-byte pointer slot, u32 size, bool owns_buffer}, 16 bytes total

use core::cmp::Ordering;
use core::ffi::{c_char, c_void, CStr};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::mem;
use core::ptr;
use core::slice;
use core::str::Utf8Error;
use std::borrow::Cow;

use crate::pointer::HidlPointer;

static EMPTY_STRING: c_char = 0;

/// Returns the process-lifetime empty C string every empty [`HidlString`] points at.
pub fn empty_sentinel() -> *const c_char {
    &EMPTY_STRING
}

/// Who is responsible for releasing a value's backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The value releases the storage when it is cleared or dropped.
    Owned,
    /// Another party manages the storage and guarantees it outlives the value.
    Borrowed,
}

/// Length-prefixed, NUL-terminated 8-bit string passed across HIDL interfaces.
///
/// Ordinary construction copies into a private buffer. [`HidlString::set_to_external`]
/// instead adopts a caller-managed buffer without copying, which lets generated stubs
/// hand out strings that live inside an incoming transaction.
#[repr(C)]
pub struct HidlString {
    buffer: HidlPointer<c_char>,
    size: u32,
    owns_buffer: bool,
}

const _: () = assert!(mem::size_of::<HidlString>() == 16);
const _: () = assert!(mem::offset_of!(HidlString, buffer) == 0);
const _: () = assert!(mem::offset_of!(HidlString, size) == 8);
const _: () = assert!(mem::offset_of!(HidlString, owns_buffer) == 12);

// SAFETY: owned buffers are uniquely owned and borrowed buffers are never written through
// this type, so moving or sharing a value across threads is sound. Mutation needs `&mut`.
unsafe impl Send for HidlString {}
unsafe impl Sync for HidlString {}

impl HidlString {
    /// Creates an empty string pointing at the shared sentinel.
    pub fn new() -> Self {
        Self { buffer: HidlPointer::new(empty_sentinel()), size: 0, owns_buffer: false }
    }

    /// Copies `bytes` into a freshly allocated, NUL-terminated buffer.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut out = Self::new();
        out.copy_from(bytes);
        out
    }

    /// Copies a NUL-terminated C string; a null pointer yields an empty string.
    ///
    /// # Safety
    ///
    /// `s` must be null or point to a NUL-terminated buffer readable up to its terminator.
    pub unsafe fn from_c_str(s: *const c_char) -> Self {
        let mut out = Self::new();
        if !s.is_null() {
            out.copy_from(CStr::from_ptr(s).to_bytes());
        }
        out
    }

    /// Copies exactly `len` bytes starting at `data` and appends a NUL.
    ///
    /// # Safety
    ///
    /// `data` must be valid for reads of `len` bytes (it may be null only when `len` is 0).
    pub unsafe fn from_raw_parts(data: *const c_char, len: usize) -> Self {
        checked_size(len);
        if len == 0 {
            return Self::new();
        }
        Self::from_bytes(slice::from_raw_parts(data.cast::<u8>(), len))
    }

    /// Replaces the contents with a copy of `bytes`.
    pub fn assign(&mut self, bytes: &[u8]) {
        self.clear();
        self.copy_from(bytes);
    }

    /// Replaces the contents with a copy of a C string; null leaves the string empty.
    ///
    /// # Safety
    ///
    /// Same contract as [`HidlString::from_c_str`].
    pub unsafe fn assign_c_str(&mut self, s: *const c_char) {
        self.clear();
        if !s.is_null() {
            self.copy_from(CStr::from_ptr(s).to_bytes());
        }
    }

    /// Releases an owned buffer and resets to the empty sentinel.
    pub fn clear(&mut self) {
        let buffer = self.buffer.get();
        if self.owns_buffer && buffer != empty_sentinel() {
            // SAFETY: owned buffers are only ever produced by `copy_from` via `libc::malloc`.
            unsafe { libc::free(buffer as *mut c_void) };
        }
        self.buffer = HidlPointer::new(empty_sentinel());
        self.size = 0;
        self.owns_buffer = false;
    }

    /// Adopts `len` bytes at `data` without copying. The string never frees `data`.
    ///
    /// A zero length resets to the empty sentinel instead of keeping `data`.
    ///
    /// # Safety
    ///
    /// `data` must stay valid and unmodified for `len` bytes for as long as this value (or
    /// anything it is moved into) refers to it. If the contents are later read as a C
    /// string, `data[len]` must be a NUL byte.
    pub unsafe fn set_to_external(&mut self, data: *const c_char, len: usize) {
        let size = checked_size(len);
        self.clear();
        if size == 0 {
            return;
        }
        self.buffer = HidlPointer::new(data);
        self.size = size;
        self.owns_buffer = false;
    }

    /// Moves the contents out, leaving this value empty and non-owning.
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Pointer to the first byte; never null.
    pub fn c_str(&self) -> *const c_char {
        self.buffer.get()
    }

    /// Length in bytes, not counting the terminator.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// Returns `true` when the string has no bytes.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Reports whether the buffer is released by this value.
    pub fn ownership(&self) -> Ownership {
        if self.owns_buffer {
            Ownership::Owned
        } else {
            Ownership::Borrowed
        }
    }

    /// The string contents without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        if self.size == 0 {
            return &[];
        }
        // SAFETY: the buffer holds `size` readable bytes, either because we allocated it or
        // because the `set_to_external` caller guaranteed it.
        unsafe { slice::from_raw_parts(self.buffer.get().cast::<u8>(), self.size()) }
    }

    /// Views the contents as a C string, or `None` if they contain an interior NUL.
    pub fn as_c_str(&self) -> Option<&CStr> {
        if self.size == 0 {
            return Some(c"");
        }
        // SAFETY: owned buffers are terminated at `size`; external buffers are terminated
        // by contract whenever they are used as C strings.
        let with_nul =
            unsafe { slice::from_raw_parts(self.buffer.get().cast::<u8>(), self.size() + 1) };
        CStr::from_bytes_with_nul(with_nul).ok()
    }

    /// Interprets the contents as UTF-8.
    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        core::str::from_utf8(self.as_bytes())
    }

    /// Interprets the contents as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Copies the contents into a host-owned byte vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Assumes the current buffer has already been released.
    fn copy_from(&mut self, bytes: &[u8]) {
        let size = checked_size(bytes.len());
        if size == 0 {
            return;
        }
        let alloc_len = bytes.len() + 1;
        // SAFETY: plain C allocation; null is handled below.
        let buf = unsafe { libc::malloc(alloc_len) }.cast::<u8>();
        if buf.is_null() {
            fatal!("failed to allocate {alloc_len} bytes for hidl_string");
        }
        // SAFETY: `buf` has room for `bytes.len() + 1` bytes and cannot overlap `bytes`.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), buf, bytes.len());
            *buf.add(bytes.len()) = 0;
        }
        self.buffer = HidlPointer::new(buf.cast::<c_char>());
        self.size = size;
        self.owns_buffer = true;
    }
}

fn checked_size(len: usize) -> u32 {
    match u32::try_from(len) {
        Ok(size) => size,
        Err(_) => fatal!("string size can't exceed 2^32 bytes."),
    }
}

impl Default for HidlString {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HidlString {
    fn drop(&mut self) {
        self.clear();
    }
}

impl Clone for HidlString {
    fn clone(&self) -> Self {
        Self::from_bytes(self.as_bytes())
    }

    fn clone_from(&mut self, source: &Self) {
        self.assign(source.as_bytes());
    }
}

impl From<&[u8]> for HidlString {
    fn from(value: &[u8]) -> Self {
        Self::from_bytes(value)
    }
}

impl From<&str> for HidlString {
    fn from(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }
}

impl From<&String> for HidlString {
    fn from(value: &String) -> Self {
        Self::from_bytes(value.as_bytes())
    }
}

impl From<String> for HidlString {
    fn from(value: String) -> Self {
        Self::from_bytes(value.as_bytes())
    }
}

impl From<&CStr> for HidlString {
    fn from(value: &CStr) -> Self {
        Self::from_bytes(value.to_bytes())
    }
}

impl From<&HidlString> for Vec<u8> {
    fn from(value: &HidlString) -> Self {
        value.to_vec()
    }
}

impl AsRef<[u8]> for HidlString {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for HidlString {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for HidlString {}

impl PartialEq<[u8]> for HidlString {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<str> for HidlString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for HidlString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialOrd for HidlString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HidlString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for HidlString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl fmt::Debug for HidlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl fmt::Display for HidlString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}
