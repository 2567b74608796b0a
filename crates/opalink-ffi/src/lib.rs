//! opalink C ABI.
//!
//! Exposes the core library to foreign callers: standalone builds, the
//! prepared-query registry, evaluation, and buffer release. Every string or
//! byte buffer returned from here must be released with [`opalink_free`].
//!
//! Conventions:
//! - input strings are NUL-terminated UTF-8; null or invalid input yields an
//!   error string, never a crash
//! - results are `#[repr(C)]` structs carrying a payload XOR an error
//! - panics are caught at the boundary and reported as errors

use std::ffi::c_void;
use std::os::raw::c_char;

pub mod buffer;
pub mod compile;
pub mod logging;
pub mod rego;
pub mod result;

mod args;

pub use buffer::OwnedBuffer;
pub use compile::{opalink_build, opalink_build_manifest};
pub use logging::opalink_init_logging;
pub use rego::{
    opalink_registry_free, opalink_registry_new, opalink_rego_drop, opalink_rego_eval,
    opalink_rego_eval_bool, opalink_rego_new, opalink_rego_new_from_artifact,
};
pub use result::{OpaBoolResult, OpaBuildResult, OpaHandleResult, OpaStringResult};

/// Release a buffer returned by any opalink function. Null is a no-op.
///
/// # Safety
/// `ptr` must come from this library and must not have been released already.
#[no_mangle]
pub unsafe extern "C" fn opalink_free(ptr: *mut c_void) {
    unsafe { OwnedBuffer::release(ptr as *mut u8) }
}

/// Library version as a static NUL-terminated string. Never free it.
#[no_mangle]
pub extern "C" fn opalink_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}
