//! Databases built from TOML configuration files

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use stored::{Database, DatabaseConfig, MemoryDatabase, Promise, Response, StoredError};

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_database_from_config_file() {
    let file = write_config("max_retries = 7\nbase_delay_ms = 0\nmax_delay_ms = 0\n");
    let config = DatabaseConfig::from_file(file.path()).unwrap();
    let db = MemoryDatabase::with_config(&config);
    assert_eq!(db.retry_config().max_retries, 7);
    assert_eq!(config.history_limit, DatabaseConfig::default().history_limit);
}

#[test]
fn test_malformed_config_is_rejected() {
    let file = write_config("max_retries = [1, 2]\n");
    let err = DatabaseConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, StoredError::Config(_)));
}

#[test]
fn test_conflict_surfaces_without_retries() {
    let file = write_config("max_retries = 0\n");
    let config = DatabaseConfig::from_file(file.path()).unwrap();
    let db: Arc<dyn Database> = Arc::new(MemoryDatabase::with_config(&config));
    let rounds = Arc::new(AtomicUsize::new(0));

    let competitor = Arc::clone(&db);
    let counter = Arc::clone(&rounds);
    let promise = Promise::write(Arc::clone(&db), move |attempt| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = attempt.read().get(b"k").wait() {
            return attempt.fail(e);
        }
        if let Err(e) = competitor.transact(&mut |tr| {
            tr.set(b"k", b"theirs");
            Ok(())
        }) {
            return attempt.fail(e);
        }
        match attempt.write() {
            Ok(tr) => tr.set(b"k", b"ours"),
            Err(e) => return attempt.fail(e),
        }
        attempt.done(Response::Bool(true))
    });

    let err = promise.err().unwrap_err();
    assert!(matches!(err, StoredError::Conflict(_)));
    assert!(err.is_retryable());
    assert_eq!(rounds.load(Ordering::SeqCst), 1);
}
