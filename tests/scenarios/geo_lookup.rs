//! Geohash indexes at two precisions

use crate::common::*;
use stored::{Element, Query, RecordRef};

const SF: (f64, f64) = (37.7749, -122.4194);

fn hash_of(customers: &stored::Object, index: &str, customer: &Customer) -> String {
    let index = customers.index(index).unwrap();
    let key = index
        .derive_key(&RecordRef::new(customers.schema(), customer))
        .unwrap()
        .unwrap();
    match key.get(0) {
        Some(Element::String(hash)) => hash.clone(),
        other => panic!("unexpected geo key {:?}", other),
    }
}

#[test]
fn test_lower_precision_is_prefix() {
    let db = fast_db();
    let customers = customers(&db);
    let customer = Customer::new(1, "a@x.com").at(SF.0, SF.1);

    let h6 = hash_of(&customers, "near6", &customer);
    let h3 = hash_of(&customers, "near3", &customer);
    assert_eq!(h6.len(), 6);
    assert_eq!(h3.len(), 3);
    assert_eq!(&h6[..3], h3);
    assert_eq!(h6, "9q8yyk");
}

#[test]
fn test_neighbors_share_coarse_cell() {
    let db = fast_db();
    let customers = customers(&db);
    customers.add(Customer::new(1, "a@x.com").at(SF.0, SF.1)).err().unwrap();
    customers.add(Customer::new(2, "b@x.com").at(37.7790, -122.4180)).err().unwrap();
    customers.add(Customer::new(3, "c@x.com").at(40.7128, -74.0060)).err().unwrap();

    let cell = hash_of(&customers, "near3", &Customer::new(0, "").at(SF.0, SF.1));
    let mut nearby: Vec<i64> = customers
        .list("near3", Query::equal(cell))
        .scan_all::<Customer>()
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    nearby.sort_unstable();
    assert_eq!(nearby, vec![1, 2]);
}

#[test]
fn test_moving_changes_cell() {
    let db = fast_db();
    let customers = customers(&db);
    customers.add(Customer::new(1, "a@x.com").at(SF.0, SF.1)).err().unwrap();
    let old_cell = hash_of(&customers, "near6", &Customer::new(1, "").at(SF.0, SF.1));

    customers
        .update(stored::tuple![1i64], |c: &mut Customer| {
            c.lat = 40.7128;
            c.lng = -74.0060;
            Ok(())
        })
        .err()
        .unwrap();

    let left_behind = customers
        .list("near6", Query::equal(old_cell))
        .values()
        .unwrap();
    assert!(left_behind.is_empty());
}
