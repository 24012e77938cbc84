//! Updating an indexed field moves its index entry

use crate::common::*;
use stored::{tuple, StoredError};

#[test]
fn test_old_email_stops_resolving() {
    let db = fast_db();
    let customers = customers(&db);
    customers.add(Customer::new(5, "old@x.com")).err().unwrap();

    customers
        .update(tuple![5i64], |c: &mut Customer| {
            c.email = "new@x.com".to_string();
            Ok(())
        })
        .err()
        .unwrap();

    let err = customers.get_by("by_email", "old@x.com").err().unwrap_err();
    assert!(matches!(err, StoredError::NotFound));

    let mut found = Customer::default();
    customers.get_by("by_email", "new@x.com").scan(&mut found).unwrap();
    assert_eq!(found.id, 5);
    assert_eq!(found.email, "new@x.com");
}

#[test]
fn test_update_onto_taken_email_changes_nothing() {
    let db = fast_db();
    let customers = customers(&db);
    customers.add(Customer::new(1, "a@x.com")).err().unwrap();
    customers.add(Customer::new(2, "b@x.com")).err().unwrap();

    let err = customers
        .update(tuple![2i64], |c: &mut Customer| {
            c.email = "a@x.com".to_string();
            Ok(())
        })
        .err()
        .unwrap_err();
    assert!(matches!(err, StoredError::AlreadyExist));

    let mut second = Customer::default();
    customers.get_by("by_email", "b@x.com").scan(&mut second).unwrap();
    assert_eq!(second.id, 2);
}

#[test]
fn test_update_of_missing_record_is_not_found() {
    let db = fast_db();
    let customers = customers(&db);
    let err = customers
        .update(tuple![9i64], |_: &mut Customer| Ok(()))
        .err()
        .unwrap_err();
    assert!(matches!(err, StoredError::NotFound));
}
