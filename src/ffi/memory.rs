//! FFI memory management functions.

use std::ffi::{c_char, CString};

use super::error::clear_last_error;

/// Free a string returned by `query`.
///
/// # Arguments
///
/// * `s` - String pointer to free, or NULL
///
/// # Safety
///
/// `s` must be a pointer returned by `query`, or NULL, and must not be
/// freed twice. After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn free_str(s: *mut c_char) {
    clear_last_error();
    if !s.is_null() {
        // SAFETY: s is non-null and was allocated by CString::into_raw
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Get the queryer library version.
///
/// Static string, never free it.
#[no_mangle]
pub extern "C" fn queryer_version() -> *const c_char {
    clear_last_error();
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr().cast()
}
