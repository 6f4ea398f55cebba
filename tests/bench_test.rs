//! Benchmark tests for link store operations
//!
//! Run with: cargo test --release -- --ignored --nocapture bench

use std::time::Instant;

use chrono::{Duration, Utc};
use tempfile::NamedTempFile;

use nimbaha::database::{find_by_id, find_by_url, init_db, list_all, upsert_by_url};
use nimbaha::model::LinkRecord;
use nimbaha::registrar::generate_id;

/// Benchmark helper to measure execution time
fn benchmark<F>(name: &str, iterations: usize, mut f: F)
where
    F: FnMut(usize),
{
    let start = Instant::now();

    for i in 0..iterations {
        f(i);
    }

    let duration = start.elapsed();
    let avg_ms = duration.as_millis() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn record(i: usize) -> LinkRecord {
    LinkRecord {
        id: generate_id(),
        url: format!("https://example.com/files/{}.bin", i),
        filename: i.to_string(),
        filesize: i as u64 * 1024,
        extension: ".bin".to_string(),
        expiry_date: Utc::now() + Duration::days(3),
    }
}

#[test]
#[ignore] // Run explicitly with: cargo test bench --release -- --ignored --nocapture
fn bench_register_and_extend() {
    println!("\n=== Benchmark: Register links ===\n");

    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();

    let iterations = 1000;
    benchmark("Insert new URLs", iterations, |i| {
        upsert_by_url(&db, &record(i)).unwrap();
    });

    benchmark("Extend known URLs", iterations, |i| {
        upsert_by_url(&db, &record(i)).unwrap();
    });

    assert_eq!(list_all(&db).unwrap().len(), iterations);
}

#[test]
#[ignore]
fn bench_lookups() {
    println!("\n=== Benchmark: Lookups ===\n");

    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();

    let iterations = 1000;
    let ids: Vec<String> = (0..iterations)
        .map(|i| upsert_by_url(&db, &record(i)).unwrap())
        .collect();

    benchmark("Find by id", iterations, |i| {
        assert!(find_by_id(&db, &ids[i]).unwrap().is_some());
    });

    benchmark("Find by url", iterations, |i| {
        let url = format!("https://example.com/files/{}.bin", i);
        assert!(find_by_url(&db, &url).unwrap().is_some());
    });

    benchmark("List all", 10, |_| {
        assert_eq!(list_all(&db).unwrap().len(), iterations);
    });
}
