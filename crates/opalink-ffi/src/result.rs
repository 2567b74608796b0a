//! `#[repr(C)]` return types.
//!
//! Each carries a success payload and an error string; exactly one of them is
//! set. A `false` decision with a null error is a legitimate success.

use std::os::raw::c_char;
use std::ptr;

use opalink_core::{Artifact, OpaLinkError};

use crate::buffer::OwnedBuffer;

/// Result of a standalone build.
#[repr(C)]
#[derive(Debug)]
pub struct OpaBuildResult {
    pub artifact: *mut u8,
    pub len: usize,
    pub error: *mut c_char,
}

/// Result of registering a prepared query.
#[repr(C)]
#[derive(Debug)]
pub struct OpaHandleResult {
    /// `0` when `error` is set.
    pub handle: u64,
    pub error: *mut c_char,
}

/// Result of a boolean decision.
#[repr(C)]
#[derive(Debug)]
pub struct OpaBoolResult {
    pub value: bool,
    pub error: *mut c_char,
}

/// Result carrying JSON text.
#[repr(C)]
#[derive(Debug)]
pub struct OpaStringResult {
    pub value: *mut c_char,
    pub error: *mut c_char,
}

pub(crate) fn error_text(msg: &str) -> *mut c_char {
    OwnedBuffer::from_text(msg).into_raw_c_str()
}

impl OpaBuildResult {
    pub(crate) fn from_result(res: Result<Artifact, String>) -> Self {
        match res {
            Ok(artifact) => {
                let len = artifact.len();
                Self {
                    artifact: OwnedBuffer::from_bytes(artifact.as_bytes()).into_raw(),
                    len,
                    error: ptr::null_mut(),
                }
            }
            Err(msg) => Self {
                artifact: ptr::null_mut(),
                len: 0,
                error: error_text(&msg),
            },
        }
    }
}

impl OpaHandleResult {
    pub(crate) fn from_result(res: Result<u64, String>) -> Self {
        match res {
            Ok(handle) => Self {
                handle,
                error: ptr::null_mut(),
            },
            Err(msg) => Self {
                handle: 0,
                error: error_text(&msg),
            },
        }
    }
}

impl OpaBoolResult {
    pub(crate) fn from_result(res: Result<bool, String>) -> Self {
        match res {
            Ok(value) => Self {
                value,
                error: ptr::null_mut(),
            },
            Err(msg) => Self {
                value: false,
                error: error_text(&msg),
            },
        }
    }
}

impl OpaStringResult {
    pub(crate) fn from_result(res: Result<String, String>) -> Self {
        match res {
            Ok(text) => Self {
                value: OwnedBuffer::from_text(&text).into_raw_c_str(),
                error: ptr::null_mut(),
            },
            Err(msg) => Self {
                value: ptr::null_mut(),
                error: error_text(&msg),
            },
        }
    }
}

/// Engine diagnostics cross the boundary verbatim.
pub(crate) fn message(e: OpaLinkError) -> String {
    e.to_string()
}
