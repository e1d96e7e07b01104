//! FFI query functions.
//!
//! `hello` and `query` are the C entry points; results cross the boundary
//! as NUL-terminated strings.

use std::borrow::Cow;
use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use crate::dataset::OutputFormat;
use crate::error::QueryError;

use super::error::{
    clear_last_error, set_last_error, set_query_error, QUERYER_ERR_INVALID_UTF8,
    QUERYER_ERR_NULL_POINTER, QUERYER_ERR_OUTPUT, QUERYER_ERR_PANIC,
};

thread_local! {
    // Backing storage for the last greeting handed out on this thread
    static GREETING: RefCell<CString> = RefCell::new(CString::default());
}

/// Build a greeting for `name`.
///
/// # Returns
///
/// `"hello {name}!"`, or NULL if `name` is NULL. The string is owned by the
/// library and stays valid until the next `hello` call on the same thread.
/// Do NOT pass it to `free_str`.
///
/// # Safety
///
/// `name` must be NULL or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn hello(name: *const c_char) -> *const c_char {
    clear_last_error();

    if name.is_null() {
        set_last_error(QUERYER_ERR_NULL_POINTER, "name is null");
        return ptr::null();
    }

    // SAFETY: name is non-null (checked above) and NUL-terminated per contract
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
    let greeting = CString::new(greeting(&name)).unwrap_or_default();

    GREETING.with(|g| {
        let mut g = g.borrow_mut();
        *g = greeting;
        g.as_ptr()
    })
}

fn greeting(name: &str) -> String {
    format!("hello {}!", name)
}

/// Run a SQL query and return the rendered result.
///
/// # Arguments
///
/// * `sql` - NUL-terminated SQL, e.g. `select * from file://./data.json`
/// * `options` - output format: `"json"`, `"csv"` or `"table"`; NULL means `"json"`
///
/// # Returns
///
/// A newly allocated string the caller must release with `free_str`, or
/// NULL on failure (see `queryer_last_error`).
///
/// # Safety
///
/// `sql` and `options` must each be NULL or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn query(sql: *const c_char, options: *const c_char) -> *mut c_char {
    clear_last_error();

    if sql.is_null() {
        set_last_error(QUERYER_ERR_NULL_POINTER, "sql is null");
        return ptr::null_mut();
    }

    // SAFETY: sql is non-null (checked above)
    let Some(sql) = (unsafe { c_str(sql) }) else {
        return ptr::null_mut();
    };
    let options = if options.is_null() {
        Cow::Borrowed("json")
    } else {
        // SAFETY: options is non-null (checked above)
        match unsafe { c_str(options) } {
            Some(options) => options,
            None => return ptr::null_mut(),
        }
    };

    let result = catch_unwind(AssertUnwindSafe(|| run_query(&sql, &options)));

    match result {
        Ok(Ok(output)) => match CString::new(output) {
            Ok(s) => s.into_raw(),
            Err(_) => {
                set_last_error(QUERYER_ERR_OUTPUT, "result contains a NUL byte");
                ptr::null_mut()
            }
        },
        Ok(Err(err)) => {
            set_query_error(&err);
            ptr::null_mut()
        }
        Err(_) => {
            set_last_error(QUERYER_ERR_PANIC, "panic while running query");
            ptr::null_mut()
        }
    }
}

/// Borrow a C string as UTF-8, recording an error if it isn't
///
/// # Safety
///
/// `s` must be non-null and NUL-terminated.
unsafe fn c_str<'a>(s: *const c_char) -> Option<Cow<'a, str>> {
    // SAFETY: guaranteed by the caller
    match unsafe { CStr::from_ptr(s) }.to_str() {
        Ok(s) => Some(Cow::Borrowed(s)),
        Err(_) => {
            set_last_error(QUERYER_ERR_INVALID_UTF8, "argument is not valid UTF-8");
            None
        }
    }
}

/// Run the query to completion on a private single-threaded runtime
fn run_query(sql: &str, options: &str) -> Result<String, QueryError> {
    let format: OutputFormat = options.trim().parse()?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| QueryError::Execution(format!("cannot start runtime: {}", e)))?;

    let dataset = rt.block_on(crate::query(sql))?;
    dataset.render(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{
        free_str, queryer_last_error, queryer_last_error_code, QUERYER_ERR_FETCH, QUERYER_OK,
    };
    use std::io::Write;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    fn test_hello() {
        let name = c("cae");
        // SAFETY: valid C string
        let ptr = unsafe { hello(name.as_ptr()) };
        // SAFETY: valid until the next hello call
        let greeting = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(greeting, "hello cae!");
        assert_eq!(queryer_last_error_code(), QUERYER_OK);
    }

    #[test]
    fn test_hello_null() {
        // SAFETY: null is accepted
        assert!(unsafe { hello(ptr::null()) }.is_null());
        assert_eq!(queryer_last_error_code(), QUERYER_ERR_NULL_POINTER);
    }

    #[test]
    fn test_query_returns_owned_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"name": "aa", "age": 20}}, {{"name": "bb", "age": 12}}]"#).unwrap();

        let sql = c(&format!(
            "select name from file://{} where age >= 18",
            file.path().display()
        ));
        // SAFETY: valid C string, null options
        let result = unsafe { query(sql.as_ptr(), ptr::null()) };
        assert!(!result.is_null());

        // SAFETY: result is a valid string until freed
        let text = unsafe { CStr::from_ptr(result) }.to_str().unwrap().to_string();
        assert_eq!(text, r#"[{"name":"aa"}]"#);

        // SAFETY: result came from query
        unsafe { free_str(result) };
    }

    #[test]
    fn test_query_csv_option() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"a": 1, "b": "x"}}]"#).unwrap();

        let sql = c(&format!("select * from file://{}", file.path().display()));
        let format = c("csv");
        // SAFETY: valid C strings
        let result = unsafe { query(sql.as_ptr(), format.as_ptr()) };
        assert!(!result.is_null());
        // SAFETY: valid until freed
        let text = unsafe { CStr::from_ptr(result) }.to_str().unwrap().to_string();
        assert_eq!(text, "a,b\n1,x\n");
        // SAFETY: result came from query
        unsafe { free_str(result) };
    }

    #[test]
    fn test_query_failures_return_null() {
        // SAFETY: null is accepted
        assert!(unsafe { query(ptr::null(), ptr::null()) }.is_null());
        assert_eq!(queryer_last_error_code(), QUERYER_ERR_NULL_POINTER);

        let sql = c("select * from file://./no/such/file.json");
        // SAFETY: valid C string
        assert!(unsafe { query(sql.as_ptr(), ptr::null()) }.is_null());
        assert_eq!(queryer_last_error_code(), QUERYER_ERR_FETCH);
        assert!(!queryer_last_error().is_null());

        let sql = c("select * from file://./demos/data.json");
        let format = c("xml");
        // SAFETY: valid C strings
        assert!(unsafe { query(sql.as_ptr(), format.as_ptr()) }.is_null());
        assert_eq!(queryer_last_error_code(), QUERYER_ERR_OUTPUT);

        let bad = [0xffu8, 0xfe, 0];
        // SAFETY: NUL-terminated byte string
        assert!(unsafe { query(bad.as_ptr().cast(), ptr::null()) }.is_null());
        assert_eq!(queryer_last_error_code(), QUERYER_ERR_INVALID_UTF8);
    }
}
