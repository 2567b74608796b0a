#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::ffi::{CStr, CString};
use std::fs;
use std::os::raw::c_char;
use std::ptr;

use opalink_ffi::*;

const MODULE: &str = "package example\nimport rego.v1\n\ndefault allow := false\n\nallow if input.user == \"admin\"\n";

fn c(s: &str) -> CString {
    CString::new(s).unwrap()
}

/// Copy a returned string and release it.
fn take(p: *mut c_char) -> Option<String> {
    if p.is_null() {
        return None;
    }
    let s = unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string();
    unsafe { opalink_free(p.cast()) };
    Some(s)
}

struct Reg(*mut opalink_core::Registry);

impl Reg {
    fn new() -> Self {
        Self(opalink_registry_new())
    }

    fn create(&self, query: &str, source: &str) -> Result<u64, String> {
        let (q, n, s) = (c(query), c("example.rego"), c(source));
        let res = unsafe { opalink_rego_new(self.0, q.as_ptr(), n.as_ptr(), s.as_ptr()) };
        match take(res.error) {
            Some(e) => {
                assert_eq!(res.handle, 0);
                Err(e)
            }
            None => Ok(res.handle),
        }
    }

    fn eval_bool(&self, handle: u64, input: &str) -> Result<bool, String> {
        let i = c(input);
        let res = unsafe { opalink_rego_eval_bool(self.0, handle, i.as_ptr()) };
        match take(res.error) {
            Some(e) => Err(e),
            None => Ok(res.value),
        }
    }

    fn eval(&self, handle: u64, input: &str) -> Result<String, String> {
        let i = c(input);
        let res = unsafe { opalink_rego_eval(self.0, handle, i.as_ptr()) };
        match take(res.error) {
            Some(e) => {
                assert!(res.value.is_null());
                Err(e)
            }
            None => Ok(take(res.value).unwrap()),
        }
    }
}

impl Drop for Reg {
    fn drop(&mut self) {
        unsafe { opalink_registry_free(self.0) };
    }
}

#[test]
fn handles_are_issued_in_order() {
    let reg = Reg::new();
    assert_eq!(reg.create("data.example.allow", MODULE).unwrap(), 1);
    assert_eq!(reg.create("data.example.allow", MODULE).unwrap(), 2);
}

#[test]
fn boolean_decisions() {
    let reg = Reg::new();
    let h = reg.create("data.example.allow", MODULE).unwrap();
    assert!(reg.eval_bool(h, r#"{"user": "admin"}"#).unwrap());
    assert!(!reg.eval_bool(h, r#"{"user": "guest"}"#).unwrap());
    assert!(!reg.eval_bool(h, "{}").unwrap());
}

#[test]
fn undefined_query_is_false_and_empty() {
    let reg = Reg::new();
    let h = reg.create("data.example.missing", MODULE).unwrap();
    assert!(!reg.eval_bool(h, "{}").unwrap());
    assert_eq!(reg.eval(h, "{}").unwrap(), "[]");
}

#[test]
fn full_result_is_json() {
    let reg = Reg::new();
    let h = reg.create("data.example.allow", MODULE).unwrap();
    let text = reg.eval(h, r#"{"user": "admin"}"#).unwrap();
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v[0]["expressions"][0]["value"], serde_json::json!(true));
    assert_eq!(v[0]["expressions"][0]["text"], "data.example.allow");
}

#[test]
fn malformed_input_is_an_error() {
    let reg = Reg::new();
    let h = reg.create("data.example.allow", MODULE).unwrap();
    assert!(reg.eval_bool(h, "{not json").is_err());
    assert!(reg.eval(h, "{not json").is_err());
}

#[test]
fn compile_errors_carry_no_handle() {
    let reg = Reg::new();
    let err = reg.create("data.example.allow", "package example\nallow {{{").unwrap_err();
    assert!(!err.is_empty());
    assert_eq!(reg.create("data.example.allow", MODULE).unwrap(), 1);
}

#[test]
fn dropped_handles_are_not_found() {
    let reg = Reg::new();
    let h = reg.create("data.example.allow", MODULE).unwrap();
    unsafe { opalink_rego_drop(reg.0, h) };
    unsafe { opalink_rego_drop(reg.0, h) };
    unsafe { opalink_rego_drop(reg.0, 999) };
    assert_eq!(reg.eval_bool(h, "{}").unwrap_err(), "could not find rego query");
    assert_eq!(reg.eval(h, "{}").unwrap_err(), "could not find rego query");
}

#[test]
fn null_arguments_are_errors() {
    let reg = Reg::new();
    let q = c("data.example.allow");
    let res = unsafe { opalink_rego_new(reg.0, q.as_ptr(), ptr::null(), ptr::null()) };
    assert_eq!(res.handle, 0);
    assert_eq!(take(res.error).unwrap(), "module_name must not be null");

    let h = reg.create("data.example.allow", MODULE).unwrap();
    let res = unsafe { opalink_rego_eval_bool(reg.0, h, ptr::null()) };
    assert_eq!(take(res.error).unwrap(), "input_json must not be null");

    let res = unsafe { opalink_rego_eval_bool(ptr::null(), h, q.as_ptr()) };
    assert_eq!(take(res.error).unwrap(), "registry must not be null");

    unsafe { opalink_rego_drop(ptr::null(), h) };
    unsafe { opalink_registry_free(ptr::null_mut()) };
    unsafe { opalink_free(ptr::null_mut()) };
}

#[test]
fn invalid_utf8_is_an_error() {
    let reg = Reg::new();
    let h = reg.create("data.example.allow", MODULE).unwrap();
    let bad = CString::new(vec![0xff, 0xfe]).unwrap();
    let res = unsafe { opalink_rego_eval_bool(reg.0, h, bad.as_ptr()) };
    assert!(take(res.error).unwrap().starts_with("input_json is not valid utf-8"));
}

fn build(query: &str, data: &[&str], ignore: &[&str]) -> Result<Vec<u8>, String> {
    let q = c(query);
    let data: Vec<CString> = data.iter().map(|s| c(s)).collect();
    let data_ptrs: Vec<*const c_char> = data.iter().map(|s| s.as_ptr()).collect();
    let ignore: Vec<CString> = ignore.iter().map(|s| c(s)).collect();
    let ignore_ptrs: Vec<*const c_char> = ignore.iter().map(|s| s.as_ptr()).collect();
    let res = unsafe {
        opalink_build(
            q.as_ptr(),
            data_ptrs.as_ptr(),
            data_ptrs.len(),
            ptr::null(),
            0,
            ignore_ptrs.as_ptr(),
            ignore_ptrs.len(),
        )
    };
    if let Some(e) = take(res.error) {
        assert!(res.artifact.is_null());
        return Err(e);
    }
    let bytes = unsafe { std::slice::from_raw_parts(res.artifact, res.len) }.to_vec();
    unsafe { opalink_free(res.artifact.cast()) };
    Ok(bytes)
}

fn policy_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("example.rego"), MODULE).unwrap();
    fs::write(dir.path().join("data.json"), r#"{"admins": ["root"]}"#).unwrap();
    dir
}

#[test]
fn build_is_deterministic() {
    let dir = policy_tree();
    let root = dir.path().to_str().unwrap();
    let a = build("data.example.allow", &[root], &[]).unwrap();
    let b = build("data.example.allow", &[root], &[]).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn build_honours_ignore_patterns() {
    let dir = policy_tree();
    fs::write(dir.path().join("broken.rego"), "package broken\nallow {{{").unwrap();
    let root = dir.path().to_str().unwrap();
    assert!(build("data.example.allow", &[root], &[]).is_err());
    assert!(build("data.example.allow", &[root], &["broken.*"]).is_ok());
}

#[test]
fn built_artifact_registers_and_evaluates() {
    let dir = policy_tree();
    let root = dir.path().to_str().unwrap();
    let bytes = build("data.example.allow", &[root], &[]).unwrap();

    let reg = Reg::new();
    let res = unsafe { opalink_rego_new_from_artifact(reg.0, bytes.as_ptr(), bytes.len()) };
    assert!(take(res.error).is_none());
    assert!(reg.eval_bool(res.handle, r#"{"user": "admin"}"#).unwrap());
}

#[test]
fn corrupt_artifact_is_rejected() {
    let reg = Reg::new();
    let res = unsafe { opalink_rego_new_from_artifact(reg.0, b"junk".as_ptr(), 4) };
    assert_eq!(res.handle, 0);
    assert!(take(res.error).is_some());
}

#[test]
fn missing_data_path_fails_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(build("data.example.allow", &[missing.to_str().unwrap()], &[]).is_err());
}

#[test]
fn manifest_build_resolves_relative_paths() {
    let dir = policy_tree();
    let manifest = dir.path().join("opalink.yaml");
    fs::write(
        &manifest,
        "version: 1\nquery: data.example.allow\ndata:\n  - .\nignore:\n  - \"*.yaml\"\n",
    )
    .unwrap();
    let path = c(manifest.to_str().unwrap());
    let res = unsafe { opalink_build_manifest(path.as_ptr()) };
    assert!(take(res.error).is_none());
    assert!(res.len > 0);
    unsafe { opalink_free(res.artifact.cast()) };
}

#[test]
fn version_is_static() {
    let v = unsafe { CStr::from_ptr(opalink_version()) };
    assert_eq!(v.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
}
