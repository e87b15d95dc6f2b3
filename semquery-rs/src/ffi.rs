//! C FFI bindings for semquery
//!
//! Exposes dataset registration and query compilation to C/C++ hosts such as
//! a DuckDB extension. The host executes the compiled SQL itself.
//!
//! Safety: These functions are `extern "C"` and expect valid, NUL-terminated
//! C strings. Every string returned by this module must be released with
//! `semquery_free` (or `semquery_free_result`).
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::layer::SemanticLayer;

/// Process-wide layer shared by every call through the C boundary
static SEMANTIC_LAYER: Lazy<SemanticLayer> = Lazy::new(SemanticLayer::default);

/// Result of a fallible call: exactly one of `value` and `error` is non-null
#[repr(C)]
pub struct SemqueryResult {
    pub value: *mut c_char,
    pub error: *mut c_char,
}

impl SemqueryResult {
    fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(value) => Self::ok(&value),
            Err(e) => Self::err(&e.to_string()),
        }
    }

    fn ok(value: &str) -> Self {
        Self {
            value: to_c_string(value),
            error: ptr::null_mut(),
        }
    }

    fn err(message: &str) -> Self {
        Self {
            value: ptr::null_mut(),
            error: to_c_string(message),
        }
    }
}

/// Register a dataset from separate measure and dimension JSON arrays
///
/// On success `value` holds the confirmation message.
/// Caller must free with `semquery_free_result`.
#[no_mangle]
pub extern "C" fn semquery_register_dataset(
    name: *const c_char,
    measures_json: *const c_char,
    dimensions_json: *const c_char,
) -> SemqueryResult {
    let name = match read_str(name, "name") {
        Ok(s) => s,
        Err(e) => return SemqueryResult::err(&e),
    };
    let measures = match read_str(measures_json, "measures_json") {
        Ok(s) => s,
        Err(e) => return SemqueryResult::err(&e),
    };
    let dimensions = match read_str(dimensions_json, "dimensions_json") {
        Ok(s) => s,
        Err(e) => return SemqueryResult::err(&e),
    };

    SemqueryResult::from_result(SEMANTIC_LAYER.register_dataset(name, measures, dimensions))
}

/// Register a dataset from a combined `{measures, dimensions, time_dimensions}`
/// document
///
/// Caller must free with `semquery_free_result`.
#[no_mangle]
pub extern "C" fn semquery_register_dataset_json(
    name: *const c_char,
    dataset_json: *const c_char,
) -> SemqueryResult {
    let name = match read_str(name, "name") {
        Ok(s) => s,
        Err(e) => return SemqueryResult::err(&e),
    };
    let dataset = match read_str(dataset_json, "dataset_json") {
        Ok(s) => s,
        Err(e) => return SemqueryResult::err(&e),
    };

    SemqueryResult::from_result(SEMANTIC_LAYER.register_dataset_json(name, dataset))
}

/// Compile a JSON semantic query to SQL
///
/// On success `value` holds the SQL text; the host runs it (or returns it as
/// the `compiled_sql` column in explain mode).
/// Caller must free with `semquery_free_result`.
#[no_mangle]
pub extern "C" fn semquery_compile(query_json: *const c_char) -> SemqueryResult {
    let query = match read_str(query_json, "query_json") {
        Ok(s) => s,
        Err(e) => return SemqueryResult::err(&e),
    };

    SemqueryResult::from_result(SEMANTIC_LAYER.compile(query))
}

/// Check if a name is a registered dataset
#[no_mangle]
pub extern "C" fn semquery_is_dataset(name: *const c_char) -> bool {
    match read_str(name, "name") {
        Ok(name) => SEMANTIC_LAYER.registry().contains(name),
        Err(_) => false,
    }
}

/// Get list of registered dataset names (comma-separated, sorted)
///
/// Caller must free the returned string with `semquery_free`.
#[no_mangle]
pub extern "C" fn semquery_list_datasets() -> *mut c_char {
    to_c_string(&SEMANTIC_LAYER.registry().names().join(","))
}

/// Remove every registered dataset
#[no_mangle]
pub extern "C" fn semquery_clear() {
    SEMANTIC_LAYER.registry().clear();
}

/// Free a string returned by semquery functions
#[no_mangle]
pub extern "C" fn semquery_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}

/// Free a SemqueryResult
#[no_mangle]
pub extern "C" fn semquery_free_result(result: SemqueryResult) {
    semquery_free(result.value);
    semquery_free(result.error);
}

// Helper: borrow a C string argument as UTF-8
fn read_str<'a>(ptr: *const c_char, arg: &str) -> std::result::Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("Error: null {arg} pointer"));
    }

    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| format!("Error: invalid UTF-8 in {arg}: {e}"))
}

// Helper: convert Rust string to C string
fn to_c_string(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn take(ptr: *mut c_char) -> String {
        let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_string() };
        semquery_free(ptr);
        s
    }

    // The layer is process-wide, so each test uses its own dataset names.

    #[test]
    fn test_register_and_compile() {
        let name = CString::new("ffi_orders").unwrap();
        let measures = CString::new(
            r#"[{"name": "ffi_orders.total_revenue", "sql_expression": "SUM(order_amount)", "aggregation_type": "sum"}]"#,
        )
        .unwrap();
        let dimensions = CString::new(
            r#"[{"name": "ffi_orders.customer_id", "sql_expression": "customer_id"}]"#,
        )
        .unwrap();

        let result =
            semquery_register_dataset(name.as_ptr(), measures.as_ptr(), dimensions.as_ptr());
        assert!(result.error.is_null());
        assert_eq!(
            take(result.value),
            "Dataset 'ffi_orders' registered successfully"
        );
        assert!(semquery_is_dataset(name.as_ptr()));

        let query = CString::new(
            r#"{"dataset": "ffi_orders", "measures": ["ffi_orders.total_revenue"], "dimensions": ["ffi_orders.customer_id"]}"#,
        )
        .unwrap();
        let result = semquery_compile(query.as_ptr());
        assert!(result.error.is_null());

        let sql = take(result.value);
        assert!(sql.contains("SUM(order_amount)"));
        assert!(sql.contains("FROM ffi_orders"));

        let listed = take(semquery_list_datasets());
        assert!(listed.split(',').any(|n| n == "ffi_orders"));
    }

    #[test]
    fn test_register_combined_json() {
        let name = CString::new("ffi_sales").unwrap();
        let dataset = CString::new(
            r#"{"measures": [{"name": "ffi_sales.revenue", "sql": "SUM(amount)", "type": "sum"}],
                "time_dimensions": [{"name": "ffi_sales.sale_date", "sql": "sale_date"}]}"#,
        )
        .unwrap();

        let result = semquery_register_dataset_json(name.as_ptr(), dataset.as_ptr());
        assert!(result.error.is_null());
        semquery_free_result(result);

        let query = CString::new(
            r#"{"dataset": "ffi_sales", "measures": ["ffi_sales.revenue"],
                "time_dimensions": [{"dimension": "ffi_sales.sale_date", "granularity": "month"}]}"#,
        )
        .unwrap();
        let result = semquery_compile(query.as_ptr());
        assert!(result.error.is_null());
        assert!(take(result.value).contains("DATE_TRUNC('month', sale_date)"));
    }

    #[test]
    fn test_errors_are_returned() {
        let query = CString::new(r#"{"dataset": "ffi_missing", "measures": ["x"]}"#).unwrap();
        let result = semquery_compile(query.as_ptr());
        assert!(result.value.is_null());
        assert_eq!(
            take(result.error),
            "Dataset 'ffi_missing' not found in registry"
        );

        let result = semquery_compile(ptr::null());
        assert!(result.value.is_null());
        assert!(take(result.error).contains("null query_json pointer"));

        assert!(!semquery_is_dataset(ptr::null()));
    }
}
