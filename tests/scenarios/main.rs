//! End-to-end scenarios through the `stored` facade
//!
//! Each module drives one user-visible behavior across every layer:
//! object mapping, index maintenance, promises and the retrying store.

#[path = "../common/mod.rs"]
mod common;

mod configuration;
mod country_lists;
mod email_updates;
mod geo_lookup;
mod promise_contract;
mod properties;
mod transfers;
mod unique_emails;
