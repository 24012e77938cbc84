//! Promise execution contract seen from outside the crate

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::*;
use stored::{tuple, Chain, Database, Promise, Response, StoredError};

fn decode_counter(bytes: Option<Vec<u8>>) -> i64 {
    bytes
        .and_then(|b| <[u8; 8]>::try_from(b.as_slice()).ok())
        .map(i64::from_le_bytes)
        .unwrap_or(0)
}

/// Increment of a raw counter whose first attempt is invalidated by a
/// competing commit between its read and its write
fn contended_increment(db: &Arc<dyn Database>, attempts: &Arc<AtomicUsize>) -> Promise {
    let competitor = Arc::clone(db);
    let attempts = Arc::clone(attempts);
    Promise::write(Arc::clone(db), move |attempt| {
        let round = attempts.fetch_add(1, Ordering::SeqCst);
        let current = match attempt.read().get(b"counter").wait() {
            Ok(bytes) => decode_counter(bytes),
            Err(e) => return attempt.fail(e),
        };
        let competitor = Arc::clone(&competitor);
        Some(Chain::new(move |attempt| {
            if round == 0 {
                let competing = competitor.transact(&mut |tr| {
                    tr.set(b"counter", &10i64.to_le_bytes());
                    Ok(())
                });
                if let Err(e) = competing {
                    return attempt.fail(e);
                }
            }
            let tr = match attempt.write() {
                Ok(tr) => tr,
                Err(e) => return attempt.fail(e),
            };
            tr.set(b"counter", &(current + 1).to_le_bytes());
            attempt.done(Response::Int64(current + 1))
        }))
    })
}

#[test]
fn test_retried_attempt_starts_from_scratch() {
    let db = fast_db();
    let attempts = Arc::new(AtomicUsize::new(0));

    // The first attempt would answer 1; only the retried answer may surface
    let value = contended_increment(&db, &attempts).int64().unwrap();
    assert_eq!(value, 11);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unknown_index_fails_without_panicking() {
    let db = fast_db();
    let customers = customers(&db);
    let err = customers.get_by("by_phone", "555").err().unwrap_err();
    assert!(matches!(err, StoredError::InvalidInput(_)));
}

#[test]
fn test_wrong_accessor_is_a_kind_error() {
    let db = fast_db();
    let customers = customers(&db);
    customers.add(Customer::new(1, "a@x.com")).err().unwrap();

    let err = customers.get(tuple![1i64]).bool().unwrap_err();
    assert!(matches!(err, StoredError::WrongValueKind { expected: "bool", .. }));
}

#[test]
#[should_panic(expected = "promise has no Value")]
fn test_scan_of_boolean_promise_panics() {
    let db = fast_db();
    let customers = customers(&db);
    let mut target = Customer::default();
    let _ = customers.exists(tuple![1i64]).scan(&mut target);
}

#[test]
#[should_panic(expected = "promise does not contain any value")]
fn test_reading_response_of_plain_write_panics() {
    let db = fast_db();
    let customers = customers(&db);
    let _ = customers.add(Customer::new(1, "a@x.com")).bool();
}

#[test]
#[should_panic(expected = "promise has no Value")]
fn test_scan_of_chain_ending_in_ok_panics() {
    let db = fast_db();
    let promise = Promise::read(Arc::clone(&db), |attempt| {
        if let Err(e) = attempt.read().get(b"anything").wait() {
            return attempt.fail(e);
        }
        Some(Chain::new(|_| Some(Chain::new(|attempt| attempt.ok()))))
    });
    let mut target = Customer::default();
    let _ = promise.scan(&mut target);
}

#[test]
#[should_panic(expected = "promise has no Value")]
fn test_scan_of_single_ok_step_panics() {
    let db = fast_db();
    let mut target = Customer::default();
    let _ = Promise::read(db, |attempt| attempt.ok()).scan(&mut target);
}
