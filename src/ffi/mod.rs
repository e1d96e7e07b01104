//! C FFI layer for queryer.
//!
//! This module provides `extern "C"` functions for running queries from C
//! and any language with C FFI support.
//!
//! # Design
//!
//! - **Owned results**: `query` returns a heap string the caller frees with `free_str`
//! - **Null on failure**: failing calls return NULL instead of aborting
//! - **Thread-local errors**: `queryer_last_error()` returns the last error message
//! - **No unwinding**: panics are caught at the boundary
//!
//! # Example (C)
//!
//! ```c
//! #include "queryer.h"
//!
//! int main() {
//!     printf("%s\n", hello("cae"));
//!
//!     char *result = query("select * from file://./demos/data.json", NULL);
//!     if (result == NULL) {
//!         printf("Error: %s\n", queryer_last_error());
//!         return 1;
//!     }
//!     printf("%s\n", result);
//!     free_str(result);
//!     return 0;
//! }
//! ```

mod error;
mod memory;
mod query;

// Re-export all FFI functions
pub use error::*;
pub use memory::*;
pub use query::*;
