//! Shared test utilities for the end-to-end suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's
//! main.rs.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use stored::{
    Database, DatabaseConfig, Directory, FieldKind, FieldValue, MemoryDatabase, Object, Record,
    Result, StoredError,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Database that retries conflicts without sleeping
pub fn fast_db() -> Arc<dyn Database> {
    init_tracing();
    let config = DatabaseConfig {
        max_retries: 50,
        base_delay_ms: 0,
        max_delay_ms: 0,
        ..DatabaseConfig::default()
    };
    Arc::new(MemoryDatabase::with_config(&config))
}

// ============================================================================
// Customers
// ============================================================================

/// A customer with an email, a country and a location
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    pub id: i64,
    pub email: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
}

impl Customer {
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
}

impl Record for Customer {
    fn get_field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => self.id.into(),
            "email" => self.email.clone().into(),
            "country" => self.country.clone().into(),
            "lat" => self.lat.into(),
            "lng" => self.lng.into(),
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
            (other, _) => {
                return Err(StoredError::invalid_input(format!(
                    "customer has no field '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

pub fn customers(db: &Arc<dyn Database>) -> Object {
    Directory::new(Arc::clone(db), "shop")
        .object::<Customer>("customer")
        .field("id", FieldKind::Int64)
        .field("email", FieldKind::String)
        .field("country", FieldKind::String)
        .field("lat", FieldKind::Float64)
        .field("lng", FieldKind::Float64)
        .primary(&["id"])
        .unique("by_email", "email")
        .index("by_country", "country")
        .geo("near6", "lat", "lng", 6)
        .geo("near3", "lat", "lng", 3)
        .build()
        .expect("valid customer object")
}

// ============================================================================
// Accounts
// ============================================================================

/// A balance held by one owner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub id: String,
    pub balance: i64,
    pub limit: i64,
}

impl Account {
    pub fn new(id: &str, balance: i64) -> Self {
        Self {
            id: id.to_string(),
            balance,
            limit: i64::MAX,
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }
}

impl Record for Account {
    fn get_field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => self.id.clone().into(),
            "balance" => self.balance.into(),
            "limit" => self.limit.into(),
            _ => return None,
        })
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        match (name, value) {
            ("id", FieldValue::String(v)) => self.id = v,
            ("balance", FieldValue::Int64(v)) => self.balance = v,
            ("limit", FieldValue::Int64(v)) => self.limit = v,
            (other, _) => {
                return Err(StoredError::invalid_input(format!(
                    "account has no field '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

pub fn accounts(db: &Arc<dyn Database>) -> Object {
    Directory::new(Arc::clone(db), "bank")
        .object::<Account>("account")
        .field("id", FieldKind::String)
        .field("balance", FieldKind::Int64)
        .field("limit", FieldKind::Int64)
        .primary(&["id"])
        .build()
        .expect("valid account object")
}

/// Promise subtracting `amount` from account `id`
pub fn debit(accounts: &Object, id: &str, amount: i64) -> stored::Promise {
    accounts.update(stored::tuple![id], move |acc: &mut Account| {
        if acc.balance < amount {
            return Err(StoredError::validation("insufficient funds"));
        }
        acc.balance -= amount;
        Ok(())
    })
}

/// Promise adding `amount` to account `id`, rejected above its limit
pub fn credit(accounts: &Object, id: &str, amount: i64) -> stored::Promise {
    accounts.update(stored::tuple![id], move |acc: &mut Account| {
        if acc.balance + amount > acc.limit {
            return Err(StoredError::validation("credit limit exceeded"));
        }
        acc.balance += amount;
        Ok(())
    })
}

pub fn balance(accounts: &Object, id: &str) -> i64 {
    let account: Account = accounts
        .get(stored::tuple![id])
        .value()
        .unwrap()
        .materialize()
        .unwrap();
    account.balance
}
