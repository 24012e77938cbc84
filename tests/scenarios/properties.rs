//! Order-independent listing and key derivation properties

use std::collections::BTreeSet;

use proptest::prelude::*;

use crate::common::*;
use stored::{Element, Query, RecordRef};

fn shuffled_ids() -> impl Strategy<Value = Vec<i64>> {
    (1usize..12).prop_flat_map(|n| Just((1..=n as i64).collect::<Vec<_>>()).prop_shuffle())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_listing_ignores_insertion_order(ids in shuffled_ids()) {
        let db = fast_db();
        let customers = customers(&db);
        for id in &ids {
            let email = format!("c{}@x.com", id);
            customers.add(Customer::new(*id, &email).in_country("US")).err().unwrap();
        }

        let listed: BTreeSet<i64> = customers
            .list("by_country", Query::equal("US"))
            .scan_all::<Customer>()
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        prop_assert_eq!(listed, ids.iter().copied().collect::<BTreeSet<_>>());
    }

    #[test]
    fn prop_geo_precisions_nest(lat in -89.0f64..89.0, lng in -179.0f64..179.0) {
        prop_assume!(lat != 0.0 || lng != 0.0);
        let db = fast_db();
        let customers = customers(&db);
        let customer = Customer::new(1, "a@x.com").at(lat, lng);
        let record = RecordRef::new(customers.schema(), &customer);

        let fine = geo_hash(&customers, "near6", &record);
        let coarse = geo_hash(&customers, "near3", &record);
        prop_assert_eq!(fine.len(), 6);
        prop_assert_eq!(coarse.len(), 3);
        prop_assert!(fine.starts_with(coarse.as_str()));
    }
}

fn geo_hash(customers: &stored::Object, index: &str, record: &RecordRef<'_>) -> String {
    let key = customers.index(index).unwrap().derive_key(record).unwrap().unwrap();
    match key.get(0) {
        Some(Element::String(hash)) => hash.clone(),
        other => panic!("unexpected geo key {:?}", other),
    }
}
