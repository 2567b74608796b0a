//! Standalone build entry points.

use std::os::raw::c_char;
use std::path::Path;

use opalink_core::{build_from_manifest, config};

use crate::args::{guard, str_arg, str_list};
use crate::result::{message, OpaBuildResult};

/// Load `data` (filtered by `ignore`) and `bundles`, compile with `query`,
/// and return the artifact bytes.
///
/// # Safety
/// Every string pointer must be null or NUL-terminated; each array must hold
/// at least its stated number of pointers.
#[no_mangle]
pub unsafe extern "C" fn opalink_build(
    query: *const c_char,
    data: *const *const c_char,
    data_len: usize,
    bundles: *const *const c_char,
    bundles_len: usize,
    ignore: *const *const c_char,
    ignore_len: usize,
) -> OpaBuildResult {
    OpaBuildResult::from_result(guard(|| {
        let query = unsafe { str_arg(query, "query") }?;
        let data = unsafe { str_list(data, data_len, "data") }?;
        let bundles = unsafe { str_list(bundles, bundles_len, "bundles") }?;
        let ignore = unsafe { str_list(ignore, ignore_len, "ignore") }?;
        opalink_core::build(query, &data, &bundles, &ignore).map_err(message)
    }))
}

/// Build from a YAML manifest; relative paths resolve against its directory.
///
/// # Safety
/// `path` must be null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn opalink_build_manifest(path: *const c_char) -> OpaBuildResult {
    OpaBuildResult::from_result(guard(|| {
        let path = Path::new(unsafe { str_arg(path, "path") }?);
        let manifest = config::load_from_file(path).map_err(message)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        build_from_manifest(&manifest, base).map_err(message)
    }))
}
