//! Concurrent access tests
//!
//! Writers and readers share one engine while flushes and compactions run.

use std::sync::Arc;
use std::thread;

use stratakv::engine::Engine;
use tempfile::TempDir;

use crate::test_config;

const THREADS: usize = 8;
const KEYS_PER_THREAD: usize = 200;

#[test]
fn test_concurrent_writers_distinct_keys() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.memtable_entry_limit = 64;
    let engine = Arc::new(Engine::open(config).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..KEYS_PER_THREAD {
                    let key = format!("t{}-k{}", t, i);
                    engine.set(key.as_bytes(), format!("v{}", i).as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(engine.segment_count() > 0);
    for t in 0..THREADS {
        for i in 0..KEYS_PER_THREAD {
            let key = format!("t{}-k{}", t, i);
            assert_eq!(
                engine.get(key.as_bytes()).unwrap(),
                format!("v{}", i).into_bytes()
            );
        }
    }
    assert_eq!(engine.get_all().unwrap().len(), THREADS * KEYS_PER_THREAD);
}

#[test]
fn test_reads_during_flush_and_compaction() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config(temp.path());
    config.memtable_entry_limit = 16;
    config.max_segments = 3;
    let engine = Arc::new(Engine::open(config).unwrap());

    for i in 0..50 {
        engine.set(format!("stable{}", i).as_bytes(), b"fixed").unwrap();
    }
    engine.flush().unwrap();

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..500 {
                engine.set(format!("churn{}", i % 40).as_bytes(), format!("{}", i).as_bytes()).unwrap();
            }
        })
    };
    let compactor = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..20 {
                engine.maybe_compact().unwrap();
                thread::yield_now();
            }
        })
    };
    let reader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for round in 0..200 {
                let key = format!("stable{}", round % 50);
                assert_eq!(engine.get(key.as_bytes()).unwrap(), b"fixed");
            }
        })
    };

    writer.join().unwrap();
    compactor.join().unwrap();
    reader.join().unwrap();

    for i in 0..40 {
        assert!(engine.get(format!("churn{}", i).as_bytes()).is_ok());
    }
}

#[test]
fn test_concurrent_deletes_return_once() {
    let (_temp, engine) = crate::setup_temp_engine();
    let engine = Arc::new(engine);
    engine.set(b"shared", b"v").unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.del(b"shared").is_ok())
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
}
