//! Processed Transaction Ledger
//!
//! Provider redirects can be replayed by the browser or forwarded by a user,
//! so every verified transaction is claimed here before a tenant is created.
//! A transaction id moves `Processing -> Completed` at most once; a failed
//! registration releases the claim so the customer can retry.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PaymentError, Result};

/// Ledger state of a single transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    Processing,
    Completed,
}

/// A claimed transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction_id: String,
    pub tx_ref: String,
    pub state: EntryState,
    pub organization_id: Option<Uuid>,
    pub claimed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Result of trying to claim a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    /// Caller owns the transaction and must `complete` or `release` it
    Acquired,
    /// A tenant was already provisioned for this payment
    AlreadyCompleted,
    /// Another request holds the claim
    InFlight,
}

/// Ledger storage trait
pub trait TransactionLedger: Send + Sync {
    /// Claim a transaction for provisioning (atomic check + insert)
    fn claim(&self, transaction_id: &str, tx_ref: &str) -> Result<Claim>;

    /// Mark a claimed transaction as provisioned
    fn complete(&self, transaction_id: &str, organization_id: Uuid) -> Result<()>;

    /// Drop an unfinished claim
    fn release(&self, transaction_id: &str) -> Result<()>;

    fn get(&self, transaction_id: &str) -> Result<Option<LedgerEntry>>;
}

/// How long completed entries are kept for replay detection
const DEFAULT_RETENTION: TimeDelta = TimeDelta::days(30);

/// In-memory ledger, for development and single-process deployments
///
/// Entries are lost on restart. Completed entries older than the retention
/// window are pruned on each claim; after that a replayed redirect is only
/// stopped by the registrar's duplicate-email check.
pub struct MemoryTransactionLedger {
    entries: RwLock<HashMap<String, LedgerEntry>>,
    retention: TimeDelta,
}

impl Default for MemoryTransactionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransactionLedger {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()), retention: DEFAULT_RETENTION }
    }

    #[must_use]
    pub fn with_retention(mut self, retention: std::time::Duration) -> Self {
        self.retention = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, LedgerEntry>>> {
        self.entries.read().map_err(|_| PaymentError::Storage("ledger lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, LedgerEntry>>> {
        self.entries.write().map_err(|_| PaymentError::Storage("ledger lock poisoned".into()))
    }
}

impl TransactionLedger for MemoryTransactionLedger {
    fn claim(&self, transaction_id: &str, tx_ref: &str) -> Result<Claim> {
        let mut entries = self.write()?;

        let cutoff = Utc::now() - self.retention;
        entries.retain(|_, e| e.completed_at.is_none_or(|at| at >= cutoff));

        if let Some(entry) = entries.get(transaction_id) {
            return Ok(match entry.state {
                EntryState::Completed => Claim::AlreadyCompleted,
                EntryState::Processing => Claim::InFlight,
            });
        }

        entries.insert(
            transaction_id.to_string(),
            LedgerEntry {
                transaction_id: transaction_id.to_string(),
                tx_ref: tx_ref.to_string(),
                state: EntryState::Processing,
                organization_id: None,
                claimed_at: Utc::now(),
                completed_at: None,
            },
        );
        Ok(Claim::Acquired)
    }

    fn complete(&self, transaction_id: &str, organization_id: Uuid) -> Result<()> {
        let mut entries = self.write()?;
        let entry = entries.get_mut(transaction_id).ok_or_else(|| {
            PaymentError::Storage(format!("transaction {transaction_id} was never claimed"))
        })?;

        entry.state = EntryState::Completed;
        entry.organization_id = Some(organization_id);
        entry.completed_at = Some(Utc::now());
        Ok(())
    }

    fn release(&self, transaction_id: &str) -> Result<()> {
        let mut entries = self.write()?;
        if entries.get(transaction_id).is_some_and(|e| e.state == EntryState::Processing) {
            entries.remove(transaction_id);
        }
        Ok(())
    }

    fn get(&self, transaction_id: &str) -> Result<Option<LedgerEntry>> {
        Ok(self.read()?.get(transaction_id).cloned())
    }
}
