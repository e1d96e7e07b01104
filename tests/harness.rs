// Drives the C interface the same way demos/query.c does
// Cargo runs integration tests from the package root, so relative file:// paths resolve

use queryer::ffi::{
    free_str, hello, query, queryer_last_error, queryer_last_error_code, QUERYER_ERR_FETCH,
    QUERYER_ERR_PARSE, QUERYER_OK,
};
use std::ffi::{CStr, CString};
use std::ptr;

/// What the harness would print: the greeting line, then the result line
fn run_harness(sql: &str) -> (String, Option<String>) {
    let name = CString::new("cae").unwrap();
    let sql = CString::new(sql).unwrap();

    // SAFETY: valid C strings; hello's result is read before any other call
    let greeting = unsafe { CStr::from_ptr(hello(name.as_ptr())) }
        .to_str()
        .unwrap()
        .to_string();

    // SAFETY: valid C string, NULL options
    let result = unsafe { query(sql.as_ptr(), ptr::null()) };
    let output = if result.is_null() {
        None
    } else {
        // SAFETY: result is valid until freed
        Some(unsafe { CStr::from_ptr(result) }.to_str().unwrap().to_string())
    };

    // SAFETY: result came from query (or is NULL)
    unsafe { free_str(result) };
    (greeting, output)
}

#[test]
fn harness_prints_two_lines() {
    let (greeting, result) = run_harness("select * from file://./demos/data.json");
    let result = result.expect("query should succeed");

    let stdout = format!("{}\n{}\n", greeting, result);
    assert_eq!(stdout.lines().count(), 2);
    assert_eq!(greeting, "hello cae!");
    assert_eq!(queryer_last_error_code(), QUERYER_OK);

    let rows: Vec<serde_json::Value> = serde_json::from_str(&result).unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["name"], "Ada");
    assert_eq!(rows[3]["city"], serde_json::Value::Null);
}

#[test]
fn harness_query_with_filter_and_order() {
    let (_, result) = run_harness(
        "SELECT name, score FROM file://./demos/data.json \
         WHERE age >= 18 ORDER BY score DESC LIMIT 2",
    );
    assert_eq!(
        result.unwrap(),
        r#"[{"name":"Ada","score":91.5},{"name":"Chen","score":88.25}]"#
    );
}

#[test]
fn harness_reports_errors_instead_of_crashing() {
    let (greeting, result) = run_harness("select * from file://./demos/missing.json");
    assert_eq!(greeting, "hello cae!");
    assert!(result.is_none());
    assert_eq!(queryer_last_error_code(), QUERYER_ERR_FETCH);

    // SAFETY: a message is recorded after a failed call
    let message = unsafe { CStr::from_ptr(queryer_last_error()) }.to_str().unwrap();
    assert!(message.contains("missing.json"));

    let (_, result) = run_harness("select from where");
    assert!(result.is_none());
    assert_eq!(queryer_last_error_code(), QUERYER_ERR_PARSE);
}
