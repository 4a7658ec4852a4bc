//! Lifecycle tests for engine ownership
//!
//! These tests drive `BlockScanner` over a recording backend and check that
//! every engine is destroyed exactly once and that nothing reaches the
//! backend after disposal.

use blockscan::{BackendError, BlockScanner, EngineBackend, Error, HandleState, SharedScanner};
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Calls {
    created: AtomicUsize,
    compiled: AtomicUsize,
    scanned: AtomicUsize,
    destroyed: AtomicUsize,
    double_frees: AtomicUsize,
    live: Mutex<HashSet<usize>>,
}

impl Calls {
    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn forwarded(&self) -> usize {
        Self::get(&self.compiled) + Self::get(&self.scanned)
    }
}

/// Backend that records every call and detects double frees
#[derive(Clone, Default)]
struct RecordingBackend {
    calls: Arc<Calls>,
    refuse_create: bool,
    fail_destroy: bool,
}

impl RecordingBackend {
    fn new() -> Self {
        Self::default()
    }
}

impl EngineBackend for RecordingBackend {
    type Handle = usize;

    fn create_engine(&self) -> Result<usize, BackendError> {
        if self.refuse_create {
            return Err(BackendError::new(-7, "engine allocation failed"));
        }
        let id = self.calls.created.fetch_add(1, Ordering::SeqCst);
        self.calls.live.lock().unwrap().insert(id);
        Ok(id)
    }

    fn compile_database(&self, handle: &mut usize, pattern_file: &Path) -> Result<(), BackendError> {
        assert!(self.calls.live.lock().unwrap().contains(handle));
        self.calls.compiled.fetch_add(1, Ordering::SeqCst);
        if pattern_file.to_string_lossy().contains("bad") {
            return Err(BackendError::new(-5, "pattern rejected"));
        }
        Ok(())
    }

    fn scan_buffer(&self, handle: &mut usize, data: &[u8]) -> Result<i32, BackendError> {
        assert!(self.calls.live.lock().unwrap().contains(handle));
        self.calls.scanned.fetch_add(1, Ordering::SeqCst);
        match data {
            b"boom" => Err(BackendError::new(-9, "engine fault")),
            b"garbage" => Ok(-42),
            d if d.windows(3).any(|w| w == b"abc") => Ok(1),
            _ => Ok(-1),
        }
    }

    fn destroy_engine(&self, handle: usize) -> Result<(), BackendError> {
        self.calls.destroyed.fetch_add(1, Ordering::SeqCst);
        if !self.calls.live.lock().unwrap().remove(&handle) {
            self.calls.double_frees.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail_destroy {
            return Err(BackendError::new(-3, "release failed"));
        }
        Ok(())
    }
}

#[test]
fn test_repeated_dispose_destroys_once() {
    let backend = RecordingBackend::new();
    let calls = Arc::clone(&backend.calls);

    let mut scanner = BlockScanner::with_backend(backend).unwrap();
    for _ in 0..5 {
        scanner.dispose().unwrap();
    }
    drop(scanner);

    assert_eq!(Calls::get(&calls.created), 1);
    assert_eq!(Calls::get(&calls.destroyed), 1);
    assert_eq!(Calls::get(&calls.double_frees), 0);
}

#[test]
fn test_drop_releases_undisposed_engine() {
    let backend = RecordingBackend::new();
    let calls = Arc::clone(&backend.calls);

    {
        let mut scanner = BlockScanner::with_backend(backend).unwrap();
        scanner.compile_block_database("rules.txt").unwrap();
        assert_eq!(scanner.scan_single("xxabcxx").unwrap(), 1);
    }

    assert_eq!(Calls::get(&calls.destroyed), 1);
    assert!(calls.live.lock().unwrap().is_empty());
}

#[test]
fn test_disposed_scanner_never_reaches_backend() {
    let backend = RecordingBackend::new();
    let calls = Arc::clone(&backend.calls);

    let mut scanner = BlockScanner::with_backend(backend).unwrap();
    scanner.compile_block_database("rules.txt").unwrap();
    scanner.dispose().unwrap();
    let before = calls.forwarded();

    assert_eq!(
        scanner.compile_block_database("rules.txt"),
        Err(Error::Disposed {
            operation: "compile"
        })
    );
    assert_eq!(scanner.scan("abc"), Err(Error::Disposed { operation: "scan" }));
    assert_eq!(scanner.scan_single("abc"), Err(Error::Disposed { operation: "scan" }));
    assert_eq!(calls.forwarded(), before);
}

#[test]
fn test_scan_before_compile_never_reaches_backend() {
    let backend = RecordingBackend::new();
    let calls = Arc::clone(&backend.calls);

    let mut scanner = BlockScanner::with_backend(backend).unwrap();
    assert_eq!(scanner.scan_single("abc"), Err(Error::NotCompiled));
    assert_eq!(Calls::get(&calls.scanned), 0);
}

#[test]
fn test_construction_failure_creates_nothing_to_destroy() {
    let backend = RecordingBackend {
        refuse_create: true,
        ..RecordingBackend::new()
    };
    let calls = Arc::clone(&backend.calls);

    let err = BlockScanner::with_backend(backend).unwrap_err();
    assert!(matches!(err, Error::Construction(_)));
    assert_eq!(err.status(), Some(-7));
    assert_eq!(Calls::get(&calls.destroyed), 0);
}

#[test]
fn test_compile_error_is_distinct_and_blocks_scans() {
    let mut scanner = BlockScanner::with_backend(RecordingBackend::new()).unwrap();

    let err = scanner.compile_block_database("bad.txt").unwrap_err();
    match &err {
        Error::Compile { path, source } => {
            assert_eq!(path, Path::new("bad.txt"));
            assert_eq!(source.status, -5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(scanner.scan_single("abc"), Err(Error::NotCompiled));
}

#[test]
fn test_scan_error_is_not_no_match() {
    let mut scanner = BlockScanner::with_backend(RecordingBackend::new()).unwrap();
    scanner.compile_block_database("rules.txt").unwrap();

    assert_eq!(scanner.scan_single("zzz").unwrap(), -1);
    assert!(matches!(scanner.scan_single("boom"), Err(Error::Scan(e)) if e.status == -9));
    assert!(matches!(scanner.scan("garbage"), Err(Error::Scan(e)) if e.status == -42));

    // A failed scan does not invalidate the database
    assert_eq!(scanner.scan("abc").unwrap(), Some(1));
}

#[test]
fn test_destroy_failure_reported_once() {
    let backend = RecordingBackend {
        fail_destroy: true,
        ..RecordingBackend::new()
    };
    let calls = Arc::clone(&backend.calls);

    let mut scanner = BlockScanner::with_backend(backend).unwrap();
    assert!(matches!(scanner.dispose(), Err(Error::Destroy(_))));
    assert_eq!(scanner.state(), HandleState::Disposed);
    scanner.dispose().unwrap();
    drop(scanner);

    assert_eq!(Calls::get(&calls.destroyed), 1);
}

#[test]
fn test_drop_with_failing_destroy_does_not_panic() {
    let backend = RecordingBackend {
        fail_destroy: true,
        ..RecordingBackend::new()
    };
    let calls = Arc::clone(&backend.calls);
    drop(BlockScanner::with_backend(backend).unwrap());
    assert_eq!(Calls::get(&calls.destroyed), 1);
}

#[test]
fn test_independent_scanners_own_separate_engines() {
    let backend = RecordingBackend::new();
    let calls = Arc::clone(&backend.calls);

    let mut a = BlockScanner::with_backend(backend.clone()).unwrap();
    let b = BlockScanner::with_backend(backend).unwrap();
    assert_eq!(calls.live.lock().unwrap().len(), 2);

    a.dispose().unwrap();
    assert!(b.is_alive());
    drop(b);
    drop(a);

    assert_eq!(Calls::get(&calls.destroyed), 2);
    assert_eq!(Calls::get(&calls.double_frees), 0);
}

#[test]
fn test_shared_scanner_destroys_on_last_drop() {
    let backend = RecordingBackend::new();
    let calls = Arc::clone(&backend.calls);

    let shared = SharedScanner::with_backend(backend).unwrap();
    let clone = shared.clone();
    drop(shared);
    assert_eq!(Calls::get(&calls.destroyed), 0);
    assert!(clone.is_alive());
    drop(clone);
    assert_eq!(Calls::get(&calls.destroyed), 1);
}

#[test]
fn test_shared_dispose_then_drop_destroys_once() {
    let backend = RecordingBackend::new();
    let calls = Arc::clone(&backend.calls);

    let shared = SharedScanner::with_backend(backend).unwrap();
    let clone = shared.clone();
    shared.dispose().unwrap();
    clone.dispose().unwrap();
    drop(shared);
    drop(clone);
    assert_eq!(Calls::get(&calls.destroyed), 1);
}

#[derive(Debug, Clone)]
enum Op {
    Compile { good: bool },
    Scan { hit: bool },
    Dispose,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(|good| Op::Compile { good }),
        any::<bool>().prop_map(|hit| Op::Scan { hit }),
        Just(Op::Dispose),
    ]
}

proptest! {
    #[test]
    fn prop_engine_destroyed_exactly_once(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let backend = RecordingBackend::new();
        let calls = Arc::clone(&backend.calls);
        let mut scanner = BlockScanner::with_backend(backend).unwrap();

        let mut disposed = false;
        let mut compiled = false;
        for op in ops {
            let forwarded = calls.forwarded();
            match op {
                Op::Compile { good } => {
                    let path = if good { "good.txt" } else { "bad.txt" };
                    let result = scanner.compile_block_database(path);
                    if disposed {
                        prop_assert!(result.as_ref().is_err_and(Error::is_disposed));
                        prop_assert_eq!(calls.forwarded(), forwarded);
                    } else {
                        prop_assert_eq!(result.is_ok(), good);
                        compiled = good;
                    }
                }
                Op::Scan { hit } => {
                    let input = if hit { "xxabcxx" } else { "zzz" };
                    let result = scanner.scan_single(input);
                    if disposed {
                        prop_assert!(result.as_ref().is_err_and(Error::is_disposed));
                        prop_assert_eq!(calls.forwarded(), forwarded);
                    } else if !compiled {
                        prop_assert_eq!(result, Err(Error::NotCompiled));
                    } else {
                        prop_assert_eq!(result, Ok(if hit { 1 } else { -1 }));
                    }
                }
                Op::Dispose => {
                    prop_assert!(scanner.dispose().is_ok());
                    disposed = true;
                }
            }
            prop_assert_eq!(Calls::get(&calls.destroyed), usize::from(disposed));
        }

        drop(scanner);
        prop_assert_eq!(Calls::get(&calls.destroyed), 1);
        prop_assert_eq!(Calls::get(&calls.double_frees), 0);
    }
}
