//! Engine backends
//!
//! [`BlockScanner`](crate::BlockScanner) never talks to an engine directly;
//! it goes through an [`EngineBackend`], which exposes the four raw engine
//! operations. [`NativeBackend`] drives the C ABI in [`crate::c_api`].
//!
//! `destroy_engine` takes the handle by value, so a backend is never handed
//! the same handle twice by safe code.

use crate::c_api::{
    blockscan_compile_block_db, blockscan_engine_create, blockscan_engine_destroy,
    blockscan_engine_last_error, blockscan_engine_t, blockscan_scan_bytes,
    BLOCKSCAN_ERROR_INVALID_PARAM, BLOCKSCAN_ERROR_OUT_OF_MEMORY, BLOCKSCAN_NO_MATCH,
    BLOCKSCAN_SUCCESS,
};
use std::ffi::{CStr, CString};
use std::path::Path;
use std::ptr::NonNull;
use thiserror::Error;

/// Failure reported by a backend: a status code plus a message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (status {status})")]
pub struct BackendError {
    /// Backend status code (negative for the native engine)
    pub status: i32,
    /// Human readable description
    pub message: String,
}

impl BackendError {
    /// Create a new backend error
    pub fn new(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// The four operations a scanning engine must provide
pub trait EngineBackend {
    /// Opaque reference to one engine instance
    type Handle;

    /// Allocate a new engine with no database
    fn create_engine(&self) -> Result<Self::Handle, BackendError>;

    /// Build the block database for `handle` from a pattern file, replacing
    /// any previous one
    fn compile_database(&self, handle: &mut Self::Handle, pattern_file: &Path)
        -> Result<(), BackendError>;

    /// Scan one buffer; returns the matched pattern id or `-1`
    fn scan_buffer(&self, handle: &mut Self::Handle, data: &[u8]) -> Result<i32, BackendError>;

    /// Release the engine and everything it owns
    fn destroy_engine(&self, handle: Self::Handle) -> Result<(), BackendError>;
}

/// Owned pointer to a native engine
#[derive(Debug)]
pub struct NativeHandle(NonNull<blockscan_engine_t>);

// SAFETY: the engine has no thread affinity and NativeHandle is not Clone,
// so exactly one owner can reach the pointer at a time.
unsafe impl Send for NativeHandle {}

impl NativeHandle {
    fn as_ptr(&self) -> *mut blockscan_engine_t {
        self.0.as_ptr()
    }

    /// Error for a failed call, using the engine's own message when it has one
    fn error(&self, status: i32) -> BackendError {
        // SAFETY: the handle is alive for as long as self exists
        let msg = unsafe { blockscan_engine_last_error(self.as_ptr()) };
        let message = if msg.is_null() {
            format!("native engine returned status {}", status)
        } else {
            // SAFETY: non-null messages are valid C strings owned by the engine
            unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
        };
        BackendError::new(status, message)
    }
}

/// Backend for the engine behind the crate's C ABI
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl EngineBackend for NativeBackend {
    type Handle = NativeHandle;

    fn create_engine(&self) -> Result<NativeHandle, BackendError> {
        NonNull::new(blockscan_engine_create())
            .map(NativeHandle)
            .ok_or_else(|| {
                BackendError::new(BLOCKSCAN_ERROR_OUT_OF_MEMORY, "engine allocation failed")
            })
    }

    fn compile_database(
        &self,
        handle: &mut NativeHandle,
        pattern_file: &Path,
    ) -> Result<(), BackendError> {
        let path = pattern_file
            .to_str()
            .and_then(|s| CString::new(s).ok())
            .ok_or_else(|| {
                BackendError::new(
                    BLOCKSCAN_ERROR_INVALID_PARAM,
                    format!("pattern file path {:?} cannot be passed to the engine", pattern_file),
                )
            })?;

        // SAFETY: handle is a live engine and path is a valid C string
        let status = unsafe { blockscan_compile_block_db(handle.as_ptr(), path.as_ptr()) };
        if status == BLOCKSCAN_SUCCESS {
            Ok(())
        } else {
            Err(handle.error(status))
        }
    }

    fn scan_buffer(&self, handle: &mut NativeHandle, data: &[u8]) -> Result<i32, BackendError> {
        let mut match_id = BLOCKSCAN_NO_MATCH;
        // SAFETY: handle is a live engine; data is a valid slice
        let status = unsafe {
            blockscan_scan_bytes(handle.as_ptr(), data.as_ptr(), data.len(), &mut match_id)
        };
        if status == BLOCKSCAN_SUCCESS {
            Ok(match_id)
        } else {
            Err(handle.error(status))
        }
    }

    fn destroy_engine(&self, handle: NativeHandle) -> Result<(), BackendError> {
        // SAFETY: taking the handle by value means this pointer is never used again
        let status = unsafe { blockscan_engine_destroy(handle.as_ptr()) };
        if status == BLOCKSCAN_SUCCESS {
            Ok(())
        } else {
            Err(BackendError::new(
                status,
                format!("native engine returned status {}", status),
            ))
        }
    }
}
