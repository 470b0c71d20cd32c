//! Multithreaded tests for the `string_pool` package.
//!
//! Threads hammer the same pool with overlapping content so that every bucket sees lookups,
//! insertions and evictions racing each other.

use std::sync::{Arc, Barrier};
use std::thread;

use string_pool::{StringPool, TextEncoding};

const THREAD_COUNT: usize = 8;
const ITERATIONS: usize = 2_000;

fn words() -> Vec<String> {
    (0..100).map(|i| format!("word-{i}")).collect()
}

#[test]
fn concurrent_get_or_add_returns_equal_content() {
    let pool = Arc::new(StringPool::with_dimensions(4, 8).unwrap());
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles = (0..THREAD_COUNT)
        .map(|thread_index| {
            let pool = Arc::clone(&pool);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                let words = words();
                barrier.wait();

                for i in 0..ITERATIONS {
                    let word = &words[(i + thread_index) % words.len()];

                    let cached = if i % 2 == 0 {
                        pool.get_or_add(word)
                    } else {
                        pool.get_or_add_bytes(word.as_bytes(), TextEncoding::Utf8)
                    };

                    assert_eq!(&*cached, word.as_str());
                }
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.join().unwrap();
    }

    // 32 slots cannot hold all 100 words.
    assert!(pool.len() <= 32);
}

#[test]
fn concurrent_lookups_converge_on_one_instance() {
    // Large enough that the handful of words used here never collide in a slot.
    let pool = Arc::new(StringPool::with_dimensions(64, 64).unwrap());
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles = (0..THREAD_COUNT)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();
                pool.get_or_add("contended")
            })
        })
        .collect::<Vec<_>>();

    let results = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();

    let winner = pool.try_get("contended").unwrap();

    for result in &results {
        assert!(Arc::ptr_eq(result, &winner));
    }
}

#[test]
fn reset_during_lookups_is_safe() {
    let pool = Arc::new(StringPool::new());
    let barrier = Arc::new(Barrier::new(2));

    let reader = {
        let pool = Arc::clone(&pool);
        let barrier = Arc::clone(&barrier);

        thread::spawn(move || {
            barrier.wait();

            for _ in 0..ITERATIONS {
                assert_eq!(&*pool.get_or_add("resettable"), "resettable");
            }
        })
    };

    barrier.wait();

    for _ in 0..100 {
        pool.reset();
    }

    reader.join().unwrap();
}
