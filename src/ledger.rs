//! Points accounting.
//!
//! `earned` is the server's cumulative score and is authoritative. `spent` is
//! kept on the device, per user, and only grows through an explicit spend.

use serde::Serialize;

use crate::db::{KeyValueStore, LogOnError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
  #[error("cannot spend {requested} points, only {available} available")]
  InsufficientPoints { requested: u64, available: u64 },
}

pub fn spent_key(user_id: &str) -> String {
  format!("spent_points_{}", user_id)
}

/// Read the persisted spent total. Missing, unparseable or unreadable values are 0.
pub fn load_spent(store: &dyn KeyValueStore, user_id: &str) -> u64 {
  let key = spent_key(user_id);
  store
    .get(&key)
    .log_warn("Failed to read spent points")
    .flatten()
    .and_then(|v| {
      v.trim()
        .parse::<u64>()
        .map_err(|e| tracing::warn!("Ignoring malformed {} value {:?}: {}", key, v, e))
        .ok()
    })
    .unwrap_or(0)
}

/// Persist the spent total as given. Write failures are logged, not returned.
pub fn set_spent(store: &dyn KeyValueStore, user_id: &str, amount: u64) {
  store
    .set(&spent_key(user_id), &amount.to_string())
    .log_warn("Failed to persist spent points");
}

pub fn compute_available(earned: u64, spent: u64) -> u64 {
  earned.saturating_sub(spent)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PointsLedger {
  pub earned: u64,
  pub spent: u64,
}

impl PointsLedger {
  pub fn load(store: &dyn KeyValueStore, user_id: &str, earned: u64) -> Self {
    Self {
      earned,
      spent: load_spent(store, user_id),
    }
  }

  pub fn available(&self) -> u64 {
    compute_available(self.earned, self.spent)
  }

  /// Redeem points: grows `spent` and persists the new total.
  pub fn spend(
    &mut self,
    store: &dyn KeyValueStore,
    user_id: &str,
    amount: u64,
  ) -> Result<u64, LedgerError> {
    let available = self.available();
    if amount > available {
      return Err(LedgerError::InsufficientPoints {
        requested: amount,
        available,
      });
    }
    self.spent += amount;
    set_spent(store, user_id, self.spent);
    tracing::info!(user_id, amount, spent = self.spent, "Points spent");
    Ok(self.available())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsView {
  pub earned: u64,
  pub spent: u64,
  pub available: u64,
}

impl From<PointsLedger> for PointsView {
  fn from(ledger: PointsLedger) -> Self {
    Self {
      earned: ledger.earned,
      spent: ledger.spent,
      available: ledger.available(),
    }
  }
}
