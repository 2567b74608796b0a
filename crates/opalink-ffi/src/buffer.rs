//! Cross-boundary buffers.
//!
//! Every pointer handed to a foreign caller (artifact bytes, result JSON,
//! error text) is allocated here with a hidden length header in front of the
//! payload. That lets a single `opalink_free(ptr)` release any of them without
//! the caller passing a length back. Buffers are not tracked anywhere: the
//! receiver must release each exactly once.

use std::alloc::{self, Layout};
use std::mem;
use std::os::raw::c_char;
use std::ptr::{self, NonNull};

const HEADER: usize = mem::size_of::<usize>();
const ALIGN: usize = mem::align_of::<usize>();

/// Owned allocation that can be transferred across the C boundary.
#[derive(Debug)]
pub struct OwnedBuffer {
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: the buffer is uniquely owned plain memory.
unsafe impl Send for OwnedBuffer {}

impl OwnedBuffer {
    /// Copy `bytes` into a fresh allocation.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let buf = Self::alloc(bytes.len());
        // SAFETY: the payload region is `bytes.len()` bytes and does not overlap `bytes`.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), buf.payload(), bytes.len()) };
        buf
    }

    /// Copy `s` into a NUL-terminated allocation. C readers stop at the first
    /// interior NUL, if any.
    pub fn from_text(s: &str) -> Self {
        let buf = Self::alloc(s.len() + 1);
        // SAFETY: the payload has room for the string plus its terminator.
        unsafe {
            ptr::copy_nonoverlapping(s.as_ptr(), buf.payload(), s.len());
            *buf.payload().add(s.len()) = 0;
        }
        buf
    }

    /// Payload length in bytes (including the NUL for strings).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Hand ownership to the caller. Free with [`OwnedBuffer::release`].
    pub fn into_raw(self) -> *mut u8 {
        let p = self.payload();
        mem::forget(self);
        p
    }

    pub fn into_raw_c_str(self) -> *mut c_char {
        self.into_raw() as *mut c_char
    }

    /// Free a pointer previously returned by [`OwnedBuffer::into_raw`]. Null is a no-op.
    ///
    /// # Safety
    /// `payload` must come from `into_raw` and must not have been released already.
    pub unsafe fn release(payload: *mut u8) {
        if payload.is_null() {
            return;
        }
        // SAFETY: upheld by the caller; the header sits immediately before the payload.
        unsafe {
            let base = payload.sub(HEADER);
            let len = (base as *const usize).read();
            alloc::dealloc(base, Self::layout(len));
        }
    }

    fn alloc(len: usize) -> Self {
        let layout = Self::layout(len);
        // SAFETY: layout size is at least HEADER, never zero.
        let raw = unsafe { alloc::alloc(layout) };
        let Some(base) = NonNull::new(raw) else {
            alloc::handle_alloc_error(layout);
        };
        // SAFETY: base is aligned for usize and has room for the header.
        unsafe { (base.as_ptr() as *mut usize).write(len) };
        Self { base, len }
    }

    fn payload(&self) -> *mut u8 {
        // SAFETY: the allocation is HEADER + len bytes long.
        unsafe { self.base.as_ptr().add(HEADER) }
    }

    fn layout(len: usize) -> Layout {
        match Layout::from_size_align(HEADER.saturating_add(len), ALIGN) {
            Ok(layout) => layout,
            Err(_) => alloc::handle_alloc_error(Layout::new::<usize>()),
        }
    }
}

impl Drop for OwnedBuffer {
    fn drop(&mut self) {
        // SAFETY: `self` still owns the allocation (into_raw forgets it).
        unsafe { alloc::dealloc(self.base.as_ptr(), Self::layout(self.len)) };
    }
}
