//! Prepared-query registry entry points.
//!
//! The registry is an explicit object owned by the host: create it with
//! `opalink_registry_new`, pass it to every call, and free it with
//! `opalink_registry_free` once no other thread uses it.

use std::os::raw::c_char;
use std::slice;

use opalink_core::{Artifact, Handle, Registry};

use crate::args::{guard, registry, str_arg};
use crate::result::{message, OpaBoolResult, OpaHandleResult, OpaStringResult};

#[no_mangle]
pub extern "C" fn opalink_registry_new() -> *mut Registry {
    Box::into_raw(Box::new(Registry::new()))
}

/// # Safety
/// `reg` must be null or come from `opalink_registry_new`, and must not be in
/// use by any other call.
#[no_mangle]
pub unsafe extern "C" fn opalink_registry_free(reg: *mut Registry) {
    if !reg.is_null() {
        drop(unsafe { Box::from_raw(reg) });
    }
}

/// Compile `module_source` (named `module_name`) with `query` and register it.
///
/// # Safety
/// `reg` must be a live registry; strings must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn opalink_rego_new(
    reg: *const Registry,
    query: *const c_char,
    module_name: *const c_char,
    module_source: *const c_char,
) -> OpaHandleResult {
    OpaHandleResult::from_result(guard(|| {
        let reg = unsafe { registry(reg) }?;
        let query = unsafe { str_arg(query, "query") }?;
        let name = unsafe { str_arg(module_name, "module_name") }?;
        let source = unsafe { str_arg(module_source, "module_source") }?;
        reg.create(query, name, source).map(Handle::get).map_err(message)
    }))
}

/// Register a prepared query built from artifact bytes (see `opalink_build`).
///
/// # Safety
/// `reg` must be a live registry; `ptr` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn opalink_rego_new_from_artifact(
    reg: *const Registry,
    ptr: *const u8,
    len: usize,
) -> OpaHandleResult {
    OpaHandleResult::from_result(guard(|| {
        let reg = unsafe { registry(reg) }?;
        if ptr.is_null() {
            return Err("artifact must not be null".to_string());
        }
        let bytes = unsafe { slice::from_raw_parts(ptr, len) };
        let artifact = Artifact::from_bytes(bytes.to_vec());
        reg.create_from_artifact(&artifact)
            .map(Handle::get)
            .map_err(message)
    }))
}

/// Dispose `handle`. Unknown or already disposed handles are ignored.
///
/// # Safety
/// `reg` must be null or a live registry.
#[no_mangle]
pub unsafe extern "C" fn opalink_rego_drop(reg: *const Registry, handle: u64) {
    let _ = guard(|| {
        let reg = unsafe { registry(reg) }?;
        reg.dispose(Handle(handle));
        Ok(())
    });
}

/// Boolean decision for `input_json`.
///
/// # Safety
/// `reg` must be a live registry; `input_json` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn opalink_rego_eval_bool(
    reg: *const Registry,
    handle: u64,
    input_json: *const c_char,
) -> OpaBoolResult {
    OpaBoolResult::from_result(guard(|| {
        let reg = unsafe { registry(reg) }?;
        let prepared = reg.lookup(Handle(handle)).map_err(message)?;
        let input = unsafe { str_arg(input_json, "input_json") }?;
        prepared.eval_bool(input).map_err(message)
    }))
}

/// Full result set for `input_json`, as JSON text.
///
/// # Safety
/// `reg` must be a live registry; `input_json` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn opalink_rego_eval(
    reg: *const Registry,
    handle: u64,
    input_json: *const c_char,
) -> OpaStringResult {
    OpaStringResult::from_result(guard(|| {
        let reg = unsafe { registry(reg) }?;
        let prepared = reg.lookup(Handle(handle)).map_err(message)?;
        let input = unsafe { str_arg(input_json, "input_json") }?;
        prepared.eval_json(input).map_err(message)
    }))
}
