//! Shared fixtures for stored-layer integration tests

#![allow(dead_code)]

use std::sync::Arc;

use stored_concurrency::{DatabaseConfig, MemoryDatabase};
use stored_core::{Database, Result, StoredError};
use stored_layer::{Directory, FieldKind, FieldValue, Object, Record};

/// Test record with every indexed shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
    pub balance: i64,
}

impl User {
    pub fn new(id: i64, email: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            ..Self::default()
        }
    }

    pub fn in_country(mut self, country: &str) -> Self {
        self.country = country.to_string();
        self
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.lat = lat;
        self.lng = lng;
        self
    }

    pub fn with_balance(mut self, balance: i64) -> Self {
        self.balance = balance;
        self
    }
}

impl Record for User {
    fn get_field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => self.id.into(),
            "email" => self.email.clone().into(),
            "country" => self.country.clone().into(),
            "lat" => self.lat.into(),
            "lng" => self.lng.into(),
            "balance" => self.balance.into(),
            _ => return None,
        })
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        match (name, value) {
            ("id", FieldValue::Int64(v)) => self.id = v,
            ("email", FieldValue::String(v)) => self.email = v,
            ("country", FieldValue::String(v)) => self.country = v,
            ("lat", FieldValue::Float64(v)) => self.lat = v,
            ("lng", FieldValue::Float64(v)) => self.lng = v,
            ("balance", FieldValue::Int64(v)) => self.balance = v,
            (other, _) => return Err(StoredError::invalid_input(format!("cannot set '{}'", other))),
        }
        Ok(())
    }
}

/// Database with immediate retries
pub fn memory_db() -> Arc<MemoryDatabase> {
    let config = DatabaseConfig {
        max_retries: 100,
        base_delay_ms: 0,
        max_delay_ms: 1,
        ..DatabaseConfig::default()
    };
    Arc::new(MemoryDatabase::with_config(&config))
}

/// Domain part of an email, for the custom index
pub fn email_domain(email: &str) -> Option<Vec<u8>> {
    email.split_once('@').map(|(_, domain)| domain.as_bytes().to_vec())
}

/// The `user` object with unique, non-unique, geo and custom indexes
pub fn users(db: Arc<dyn Database>) -> Object {
    Directory::new(db, "test")
        .object::<User>("user")
        .field("id", FieldKind::Int64)
        .field("email", FieldKind::String)
        .field("country", FieldKind::String)
        .field("lat", FieldKind::Float64)
        .field("lng", FieldKind::Float64)
        .field("balance", FieldKind::Int64)
        .primary(&["id"])
        .unique("by_email", "email")
        .index("by_country", "country")
        .geo("near6", "lat", "lng", 6)
        .geo("near3", "lat", "lng", 3)
        .custom("by_domain", false, |rec| {
            rec.get("email")
                .ok()
                .and_then(|v| v.as_str().and_then(email_domain))
        })
        .build()
        .expect("valid user object")
}

/// Ids of a list of users, sorted
pub fn sorted_ids(users: &[User]) -> Vec<i64> {
    let mut ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    ids.sort_unstable();
    ids
}
