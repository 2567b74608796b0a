//! Top-level facade crate for opalink.
//!
//! Re-exports the core library and the C ABI layer so users can depend on a single crate.

pub mod core {
    pub use opalink_core::*;
}

pub mod ffi {
    pub use opalink_ffi::*;
}
