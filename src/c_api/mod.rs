//! C API for the block scanning engine
//!
//! This module provides a stable C ABI for use from C and C++ programs, and
//! is also the native side that [`NativeBackend`](crate::backend::NativeBackend)
//! drives. An engine is created with [`blockscan_engine_create`], loaded with
//! [`blockscan_compile_block_db`], scanned with [`blockscan_scan_single`] or
//! [`blockscan_scan_bytes`], and released with [`blockscan_engine_destroy`].
//!
//! Every failure is reported as a status code; nothing here terminates the
//! process. The text of the most recent failure on an engine is available
//! through [`blockscan_engine_last_error`].

mod engine;

pub use engine::*;
