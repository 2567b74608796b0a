//! Decoding of foreign arguments.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::slice;

use opalink_core::Registry;

pub(crate) type ArgResult<T> = Result<T, String>;

/// Borrow a NUL-terminated UTF-8 argument.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn str_arg<'a>(ptr: *const c_char, name: &str) -> ArgResult<&'a str> {
    if ptr.is_null() {
        return Err(format!("{name} must not be null"));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| format!("{name} is not valid utf-8: {e}"))
}

/// Borrow an array of `len` string arguments. A null array is allowed when `len == 0`.
///
/// # Safety
/// `ptr` must point to `len` valid string pointers (see [`str_arg`]).
pub(crate) unsafe fn str_list<'a>(
    ptr: *const *const c_char,
    len: usize,
    name: &str,
) -> ArgResult<Vec<&'a str>> {
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(format!("{name} must not be null when its length is {len}"));
    }
    unsafe { slice::from_raw_parts(ptr, len) }
        .iter()
        .enumerate()
        .map(|(i, p)| unsafe { str_arg(*p, &format!("{name}[{i}]")) })
        .collect()
}

/// # Safety
/// `ptr` must be null or come from `opalink_registry_new` and not be freed yet.
pub(crate) unsafe fn registry<'a>(ptr: *const Registry) -> ArgResult<&'a Registry> {
    unsafe { ptr.as_ref() }.ok_or_else(|| "registry must not be null".to_string())
}

/// Run `f`, turning a panic into an error message instead of unwinding into C.
pub(crate) fn guard<T>(f: impl FnOnce() -> ArgResult<T>) -> ArgResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(%detail, "panic caught at the C boundary");
            Err(format!("internal error: {detail}"))
        }
    }
}
