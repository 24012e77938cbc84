//! Joined promises commit or abort together

use crate::common::*;
use stored::StoredError;

#[test]
fn test_rejected_credit_aborts_debit() {
    let db = fast_db();
    let accounts = accounts(&db);
    accounts.add(Account::new("A", 100)).err().unwrap();
    accounts.add(Account::new("B", 0).with_limit(5)).err().unwrap();

    let err = debit(&accounts, "A", 10)
        .join(credit(&accounts, "B", 10))
        .err()
        .unwrap_err();
    assert!(matches!(err, StoredError::Validation(_)));

    assert_eq!(balance(&accounts, "A"), 100);
    assert_eq!(balance(&accounts, "B"), 0);
}

#[test]
fn test_accepted_transfer_moves_funds() {
    let db = fast_db();
    let accounts = accounts(&db);
    accounts.add(Account::new("A", 100)).err().unwrap();
    accounts.add(Account::new("B", 0)).err().unwrap();

    debit(&accounts, "A", 10)
        .join(credit(&accounts, "B", 10))
        .err()
        .unwrap();

    assert_eq!(balance(&accounts, "A"), 90);
    assert_eq!(balance(&accounts, "B"), 10);
}

#[test]
fn test_deferred_credit_joins_the_same_transaction() {
    let db = fast_db();
    let accounts = accounts(&db);
    accounts.add(Account::new("A", 100)).err().unwrap();
    accounts.add(Account::new("B", 0)).err().unwrap();
    accounts.add(Account::new("C", 0).with_limit(0)).err().unwrap();

    let deferred = accounts.clone();
    let group = debit(&accounts, "A", 30)
        .join(credit(&accounts, "B", 20))
        .join_do(move || credit(&deferred, "C", 10));
    assert_eq!(group.len(), 3);
    let err = group.err().unwrap_err();
    assert!(matches!(err, StoredError::Validation(_)));

    assert_eq!(balance(&accounts, "A"), 100);
    assert_eq!(balance(&accounts, "B"), 0);
    assert_eq!(balance(&accounts, "C"), 0);
}

#[test]
fn test_overdraft_is_rejected() {
    let db = fast_db();
    let accounts = accounts(&db);
    accounts.add(Account::new("A", 5)).err().unwrap();

    let err = debit(&accounts, "A", 10).err().unwrap_err();
    assert!(matches!(err, StoredError::Validation(_)));
    assert_eq!(balance(&accounts, "A"), 5);
}
