//! A non-unique index lists every record sharing a value

use std::collections::BTreeSet;

use crate::common::*;
use stored::{tuple, Query};

fn ids(list: Vec<Customer>) -> BTreeSet<i64> {
    list.into_iter().map(|c| c.id).collect()
}

#[test]
fn test_range_query_returns_every_member() {
    let db = fast_db();
    let customers = customers(&db);
    for id in [3i64, 1, 2] {
        let email = format!("c{}@x.com", id);
        customers
            .add(Customer::new(id, &email).in_country("US"))
            .err()
            .unwrap();
    }
    customers.add(Customer::new(4, "d@x.com").in_country("CA")).err().unwrap();

    let us = customers
        .list("by_country", Query::equal("US"))
        .scan_all::<Customer>()
        .unwrap();
    assert_eq!(ids(us), BTreeSet::from([1, 2, 3]));

    let ca = customers
        .list("by_country", Query::equal("CA"))
        .scan_all::<Customer>()
        .unwrap();
    assert_eq!(ids(ca), BTreeSet::from([4]));
}

#[test]
fn test_limit_reverse_and_cursor() {
    let db = fast_db();
    let customers = customers(&db);
    for id in 1..=5i64 {
        let email = format!("c{}@x.com", id);
        customers
            .add(Customer::new(id, &email).in_country("US"))
            .err()
            .unwrap();
    }

    let first_two = customers
        .list("by_country", Query::equal("US").limit(2))
        .scan_all::<Customer>()
        .unwrap();
    assert_eq!(first_two.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);

    let uncapped = customers
        .list("by_country", Query::equal("US").limit(0))
        .values()
        .unwrap();
    assert_eq!(uncapped.len(), 5);

    let last_two = customers
        .list("by_country", Query::equal("US").reverse().limit(2))
        .scan_all::<Customer>()
        .unwrap();
    assert_eq!(last_two.iter().map(|c| c.id).collect::<Vec<_>>(), vec![5, 4]);

    let from_three = customers
        .list("by_country", Query::equal("US").cursor(tuple![3i64]))
        .scan_all::<Customer>()
        .unwrap();
    assert_eq!(from_three.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3, 4, 5]);
}

#[test]
fn test_customers_without_country_are_not_listed() {
    let db = fast_db();
    let customers = customers(&db);
    customers.add(Customer::new(1, "a@x.com")).err().unwrap();

    let all = customers
        .list("by_country", Query::all())
        .values()
        .unwrap();
    assert!(all.is_empty());
}
