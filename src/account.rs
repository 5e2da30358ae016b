pub mod accounts_catalog;

pub use accounts_catalog::AccountsCatalog;

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const INITIAL_BALANCE: f64 = 10.0;

#[derive(Debug, Error, PartialEq)]
pub enum AccountError {
    #[error("account has insufficient balance: {0} available")]
    InsufficientFunds(f64),
}

/// Held only by the Registry. `recent_access_time` is
/// informational, bumped on every read or write, never consulted for
/// ordering.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Account {
    id: u32,
    balance: f64,
    recent_access_time: String,
}

impl Account {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            balance: INITIAL_BALANCE,
            recent_access_time: now(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn touch(&mut self) {
        self.recent_access_time = now();
    }

    pub fn recent_access_time(&self) -> &str {
        &self.recent_access_time
    }

    pub fn add(&mut self, amount: f64) {
        self.balance += amount;
        self.touch();
    }

    pub fn sub(&mut self, amount: f64) -> Result<(), AccountError> {
        if self.balance < amount {
            return Err(AccountError::InsufficientFunds(self.balance));
        }
        self.balance -= amount;
        self.touch();
        Ok(())
    }
}

fn now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
