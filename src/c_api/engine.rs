use crate::database::{BlockDatabase, DatabaseError};
use crate::pattern_file::PatternFileError;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::slice;

// ============================================================================
// STATUS CODES
// ============================================================================

/// Success code
pub const BLOCKSCAN_SUCCESS: i32 = 0;
/// Invalid parameter error (NULL pointer, invalid UTF-8 path)
pub const BLOCKSCAN_ERROR_INVALID_PARAM: i32 = -1;
/// Pattern file not found
pub const BLOCKSCAN_ERROR_FILE_NOT_FOUND: i32 = -2;
/// I/O error while reading the pattern file
pub const BLOCKSCAN_ERROR_IO: i32 = -3;
/// Pattern file is malformed
pub const BLOCKSCAN_ERROR_PARSE: i32 = -4;
/// An expression was rejected, or the pattern set is empty
pub const BLOCKSCAN_ERROR_COMPILE: i32 = -5;
/// Scan issued before a database was compiled
pub const BLOCKSCAN_ERROR_NO_DATABASE: i32 = -6;
/// Allocation failure
pub const BLOCKSCAN_ERROR_OUT_OF_MEMORY: i32 = -7;

/// Value written to `match_id` when nothing matched
pub const BLOCKSCAN_NO_MATCH: i32 = -1;

// ============================================================================
// OPAQUE HANDLES
// ============================================================================

/// Opaque engine handle
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct blockscan_engine_t {
    _private: [u8; 0],
}

// ============================================================================
// INTERNAL STRUCTURES
// ============================================================================

struct EngineInternal {
    /// Active block database; replaced by every compile, cleared on failure
    database: Option<BlockDatabase>,
    /// Message for the most recent failure
    last_error: Option<CString>,
}

impl EngineInternal {
    fn fail(&mut self, status: i32, message: impl Into<String>) -> i32 {
        // Interior NULs would truncate the message; replace them.
        let message = message.into().replace('\0', " ");
        self.last_error = CString::new(message).ok();
        status
    }
}

impl blockscan_engine_t {
    fn from_internal(internal: Box<EngineInternal>) -> *mut Self {
        Box::into_raw(internal) as *mut Self
    }

    /// # Safety
    /// Pointer must have come from from_internal
    unsafe fn into_internal(ptr: *mut Self) -> Box<EngineInternal> {
        Box::from_raw(ptr as *mut EngineInternal)
    }

    /// # Safety
    /// Pointer must be valid and from from_internal
    unsafe fn as_internal_mut<'a>(ptr: *mut Self) -> &'a mut EngineInternal {
        &mut *(ptr as *mut EngineInternal)
    }

    /// # Safety
    /// Pointer must be valid and from from_internal
    unsafe fn as_internal<'a>(ptr: *const Self) -> &'a EngineInternal {
        &*(ptr as *const EngineInternal)
    }
}

fn database_status(err: &DatabaseError) -> i32 {
    match err {
        DatabaseError::PatternFile(e) if e.is_not_found() => BLOCKSCAN_ERROR_FILE_NOT_FOUND,
        DatabaseError::PatternFile(PatternFileError::Io { .. }) => BLOCKSCAN_ERROR_IO,
        DatabaseError::PatternFile(_) => BLOCKSCAN_ERROR_PARSE,
        DatabaseError::Empty | DatabaseError::InvalidPattern { .. } | DatabaseError::Compile(_) => {
            BLOCKSCAN_ERROR_COMPILE
        }
    }
}

// ============================================================================
// ENGINE LIFECYCLE
// ============================================================================

/// Create a new engine with no compiled database
///
/// # Returns
/// * Non-null pointer; allocation failure aborts the process
///
/// # Example
/// ```c
/// blockscan_engine_t *engine = blockscan_engine_create();
/// blockscan_compile_block_db(engine, "rules.txt");
/// ```
#[no_mangle]
pub extern "C" fn blockscan_engine_create() -> *mut blockscan_engine_t {
    let internal = Box::new(EngineInternal {
        database: None,
        last_error: None,
    });
    blockscan_engine_t::from_internal(internal)
}

/// Destroy an engine and its compiled database
///
/// # Parameters
/// * `engine` - Engine handle (may be NULL)
///
/// # Returns
/// * BLOCKSCAN_SUCCESS (0)
///
/// # Safety
/// * `engine` must be NULL or a valid pointer from blockscan_engine_create
/// * Must not be used after calling this function, and must not be
///   destroyed twice
/// * Calling with NULL is safe (no-op)
#[no_mangle]
pub unsafe extern "C" fn blockscan_engine_destroy(engine: *mut blockscan_engine_t) -> i32 {
    if !engine.is_null() {
        drop(blockscan_engine_t::into_internal(engine));
    }
    BLOCKSCAN_SUCCESS
}

/// Message describing the most recent failure on this engine
///
/// # Returns
/// * Null-terminated string owned by the engine, valid until the next call
///   that takes this engine
/// * NULL if no call has failed or `engine` is NULL
///
/// # Safety
/// * `engine` must be NULL or a valid pointer from blockscan_engine_create
#[no_mangle]
pub unsafe extern "C" fn blockscan_engine_last_error(
    engine: *const blockscan_engine_t,
) -> *const c_char {
    if engine.is_null() {
        return ptr::null();
    }
    match &blockscan_engine_t::as_internal(engine).last_error {
        Some(msg) => msg.as_ptr(),
        None => ptr::null(),
    }
}

// ============================================================================
// COMPILE AND SCAN
// ============================================================================

/// Compile a pattern file into the engine's block database
///
/// Any previously compiled database is discarded first, so on failure the
/// engine has no database and scans report BLOCKSCAN_ERROR_NO_DATABASE.
///
/// # Parameters
/// * `engine` - Engine handle (must not be NULL)
/// * `pattern_file` - Path to the pattern file (null-terminated C string, must not be NULL)
///
/// # Returns
/// * BLOCKSCAN_SUCCESS (0) on success
/// * Error code < 0 on failure
///
/// # Safety
/// * `engine` must be a valid pointer from blockscan_engine_create
/// * `pattern_file` must be a valid null-terminated C string
///
/// # Example
/// ```c
/// if (blockscan_compile_block_db(engine, "rules.txt") != BLOCKSCAN_SUCCESS) {
///     fprintf(stderr, "%s\n", blockscan_engine_last_error(engine));
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn blockscan_compile_block_db(
    engine: *mut blockscan_engine_t,
    pattern_file: *const c_char,
) -> i32 {
    if engine.is_null() {
        return BLOCKSCAN_ERROR_INVALID_PARAM;
    }
    let internal = blockscan_engine_t::as_internal_mut(engine);
    internal.database = None;
    internal.last_error = None;

    if pattern_file.is_null() {
        return internal.fail(BLOCKSCAN_ERROR_INVALID_PARAM, "pattern file path is NULL");
    }
    let path = match CStr::from_ptr(pattern_file).to_str() {
        Ok(s) => s,
        Err(_) => {
            return internal.fail(
                BLOCKSCAN_ERROR_INVALID_PARAM,
                "pattern file path is not valid UTF-8",
            )
        }
    };

    match BlockDatabase::from_file(path) {
        Ok(db) => {
            internal.database = Some(db);
            BLOCKSCAN_SUCCESS
        }
        Err(e) => internal.fail(database_status(&e), e.to_string()),
    }
}

/// Scan a buffer against the compiled database
///
/// # Parameters
/// * `engine` - Engine handle (must not be NULL)
/// * `data` - Input bytes (may be NULL only when `len` is 0)
/// * `len` - Number of bytes in `data`
/// * `match_id` - Receives the matched pattern id, or BLOCKSCAN_NO_MATCH (-1)
///
/// # Returns
/// * BLOCKSCAN_SUCCESS (0) on success, whether or not anything matched
/// * BLOCKSCAN_ERROR_NO_DATABASE if nothing has been compiled
/// * Error code < 0 on other failures
///
/// # Safety
/// * `engine` must be a valid pointer from blockscan_engine_create
/// * `data` must point to `len` readable bytes
/// * `match_id` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn blockscan_scan_bytes(
    engine: *mut blockscan_engine_t,
    data: *const u8,
    len: usize,
    match_id: *mut i32,
) -> i32 {
    if engine.is_null() || match_id.is_null() {
        return BLOCKSCAN_ERROR_INVALID_PARAM;
    }
    let internal = blockscan_engine_t::as_internal_mut(engine);
    internal.last_error = None;

    if data.is_null() && len != 0 {
        return internal.fail(BLOCKSCAN_ERROR_INVALID_PARAM, "input is NULL");
    }
    let input = if len == 0 {
        &[][..]
    } else {
        slice::from_raw_parts(data, len)
    };

    let found = match &internal.database {
        Some(db) => db.scan(input),
        None => {
            return internal.fail(
                BLOCKSCAN_ERROR_NO_DATABASE,
                "no block database has been compiled",
            )
        }
    };

    // Pattern ids never exceed i32::MAX (enforced by the pattern file parser)
    *match_id = found.map_or(BLOCKSCAN_NO_MATCH, |id| id as i32);
    BLOCKSCAN_SUCCESS
}

/// Scan a null-terminated string against the compiled database
///
/// Equivalent to [`blockscan_scan_bytes`] over the bytes before the NUL.
///
/// # Safety
/// * `engine` must be a valid pointer from blockscan_engine_create
/// * `data` must be a valid null-terminated C string
/// * `match_id` must be a valid pointer
///
/// # Example
/// ```c
/// int id;
/// if (blockscan_scan_single(engine, "xxabcxx", &id) == BLOCKSCAN_SUCCESS && id >= 0) {
///     printf("matched pattern %d\n", id);
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn blockscan_scan_single(
    engine: *mut blockscan_engine_t,
    data: *const c_char,
    match_id: *mut i32,
) -> i32 {
    if data.is_null() {
        if !engine.is_null() {
            return blockscan_engine_t::as_internal_mut(engine)
                .fail(BLOCKSCAN_ERROR_INVALID_PARAM, "input is NULL");
        }
        return BLOCKSCAN_ERROR_INVALID_PARAM;
    }
    let bytes = CStr::from_ptr(data).to_bytes();
    blockscan_scan_bytes(engine, bytes.as_ptr(), bytes.len(), match_id)
}

/// Library version as a static null-terminated string
#[no_mangle]
pub extern "C" fn blockscan_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}
