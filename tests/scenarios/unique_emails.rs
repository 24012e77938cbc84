//! A unique index admits one owner per value

use crate::common::*;
use stored::{tuple, StoredError};

#[test]
fn test_second_owner_of_email_is_rejected() {
    let db = fast_db();
    let customers = customers(&db);

    customers.set(Customer::new(1, "a@x.com")).err().unwrap();
    let err = customers.set(Customer::new(2, "a@x.com")).err().unwrap_err();
    assert!(matches!(err, StoredError::AlreadyExist));
    assert!(!customers.exists(tuple![2i64]).bool().unwrap());

    // Rewriting the owner with the same email is not a conflict
    customers.set(Customer::new(1, "a@x.com")).err().unwrap();

    let mut found = Customer::default();
    customers.get_by("by_email", "a@x.com").scan(&mut found).unwrap();
    assert_eq!(found.id, 1);
}

#[test]
fn test_add_rejects_existing_primary_key() {
    let db = fast_db();
    let customers = customers(&db);

    customers.add(Customer::new(1, "a@x.com")).err().unwrap();
    let err = customers.add(Customer::new(1, "b@x.com")).err().unwrap_err();
    assert!(matches!(err, StoredError::AlreadyExist));

    // The rejected add left neither its fields nor its index entry behind
    let stored: Customer = customers.get(tuple![1i64]).value().unwrap().materialize().unwrap();
    assert_eq!(stored.email, "a@x.com");
    let err = customers.get_by("by_email", "b@x.com").err().unwrap_err();
    assert!(matches!(err, StoredError::NotFound));
}

#[test]
fn test_deleted_owner_frees_the_email() {
    let db = fast_db();
    let customers = customers(&db);

    customers.add(Customer::new(1, "a@x.com")).err().unwrap();
    customers.delete(tuple![1i64]).err().unwrap();
    customers.add(Customer::new(2, "a@x.com")).err().unwrap();

    let owner: Customer = customers
        .get_by("by_email", "a@x.com")
        .value()
        .unwrap()
        .materialize()
        .unwrap();
    assert_eq!(owner.id, 2);
}
