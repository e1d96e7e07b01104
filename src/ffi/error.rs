//! Thread-local error storage for FFI.
//!
//! Failing calls return NULL; this module keeps the reason so callers can
//! retrieve it via `queryer_last_error()`.

use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::ptr;

use crate::error::QueryError;

/// Success, no error recorded.
pub const QUERYER_OK: i32 = 0;
/// Null pointer was passed to a function.
pub const QUERYER_ERR_NULL_POINTER: i32 = -1;
/// Invalid UTF-8 string.
pub const QUERYER_ERR_INVALID_UTF8: i32 = -2;
/// SQL could not be parsed.
pub const QUERYER_ERR_PARSE: i32 = -10;
/// SQL uses an unsupported feature.
pub const QUERYER_ERR_UNSUPPORTED: i32 = -11;
/// Data source could not be retrieved.
pub const QUERYER_ERR_FETCH: i32 = -20;
/// Data source could not be loaded.
pub const QUERYER_ERR_LOAD: i32 = -21;
/// Query execution failed.
pub const QUERYER_ERR_EXECUTION: i32 = -30;
/// Result could not be rendered in the requested format.
pub const QUERYER_ERR_OUTPUT: i32 = -40;
/// A panic was caught at the boundary.
pub const QUERYER_ERR_PANIC: i32 = -99;

thread_local! {
    static LAST_ERROR: RefCell<Option<StoredError>> = const { RefCell::new(None) };
}

/// Stored error with pre-allocated C string.
struct StoredError {
    code: i32,
    c_message: CString,
}

/// Store an error for later retrieval.
pub(crate) fn set_last_error(code: i32, message: impl Into<String>) {
    let c_message = CString::new(message.into().replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(StoredError { code, c_message }));
}

/// Store a query error, mapping it to its FFI code.
pub(crate) fn set_query_error(err: &QueryError) {
    set_last_error(query_error_to_ffi_code(err), err.to_string());
}

/// Clear the last error.
pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

fn query_error_to_ffi_code(err: &QueryError) -> i32 {
    match err {
        QueryError::Parse(_) => QUERYER_ERR_PARSE,
        QueryError::Unsupported(_) => QUERYER_ERR_UNSUPPORTED,
        QueryError::Fetch { .. } => QUERYER_ERR_FETCH,
        QueryError::Load(_) => QUERYER_ERR_LOAD,
        QueryError::ColumnNotFound(_) | QueryError::Execution(_) => QUERYER_ERR_EXECUTION,
        QueryError::UnsupportedFormat(_) | QueryError::Output(_) => QUERYER_ERR_OUTPUT,
    }
}

/// Get the last error message.
///
/// Returns a pointer to a null-terminated string, or null if no error.
///
/// # Safety
///
/// The returned pointer is valid until the next queryer call on this thread.
/// It must not be freed.
#[no_mangle]
pub extern "C" fn queryer_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(stored) => stored.c_message.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the last error code, `QUERYER_OK` if none.
#[no_mangle]
pub extern "C" fn queryer_last_error_code() -> i32 {
    LAST_ERROR.with(|e| e.borrow().as_ref().map_or(QUERYER_OK, |stored| stored.code))
}
