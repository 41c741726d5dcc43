//! # Payment Store
//!
//! Wallet balance and transaction history for the signed-in user. Held in
//! memory only; the server is the source of truth and pushes records back
//! through [`PaymentStore::record_transaction`].
//!
//! ## Balance Rules
//! ```text
//! top_up(amount)          balance += amount
//! pay(to, amount, desc)   balance -= amount, total_spent += amount
//! refund(payment_id)      balance += amount, total_spent -= amount  (once)
//! ```
//! A failed action changes nothing and records nothing.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use chrono::Utc;
use hearth_core::validation::validate_amount;
use hearth_core::{
    generate_id, CoreError, Money, Transaction, TransactionStatus, TransactionType,
    ValidationError, Wallet,
};
use tracing::{debug, info};

use crate::error::AppResult;

/// Counterparty id for wallet top-ups.
pub const TOP_UP_SOURCE: &str = "hearth";

fn credit(total: Money, amount: Money) -> Result<Money, ValidationError> {
    total
        .checked_add(amount)
        .ok_or_else(|| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: "balance would overflow".to_string(),
        })
}

#[derive(Debug, Default)]
struct Inner {
    wallet: Option<Wallet>,
    /// Insertion order; history sorts on read.
    transactions: Vec<Transaction>,
    refunded: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct PaymentStore {
    inner: RwLock<Inner>,
}

impl PaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the wallet, e.g. after fetching it at sign-in.
    pub fn load_wallet(&self, wallet: Wallet) {
        debug!(user_id = %wallet.user_id, balance = %wallet.balance, "Wallet loaded");
        self.write().wallet = Some(wallet);
    }

    pub fn wallet(&self) -> Option<Wallet> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .wallet
            .clone()
    }

    pub fn top_up(&self, amount: Money) -> AppResult<Transaction> {
        validate_amount(amount)?;

        let mut inner = self.write();
        let wallet = inner.wallet.as_mut().ok_or(CoreError::WalletNotLoaded)?;
        wallet.balance = credit(wallet.balance, amount)?;

        let tx = completed(
            TOP_UP_SOURCE,
            &wallet.user_id,
            amount,
            TransactionType::TopUp,
            "Wallet top-up",
        );
        inner.transactions.push(tx.clone());
        info!(amount = %amount, "Wallet topped up");
        Ok(tx)
    }

    pub fn pay(&self, to_user_id: &str, amount: Money, description: &str) -> AppResult<Transaction> {
        validate_amount(amount)?;

        let mut inner = self.write();
        let wallet = inner.wallet.as_mut().ok_or(CoreError::WalletNotLoaded)?;
        let remaining =
            wallet
                .balance
                .checked_debit(amount)
                .ok_or(CoreError::InsufficientFunds {
                    balance_cents: wallet.balance.cents(),
                    requested_cents: amount.cents(),
                })?;

        let total_spent = credit(wallet.total_spent, amount)?;
        wallet.balance = remaining;
        wallet.total_spent = total_spent;

        let tx = completed(
            &wallet.user_id,
            to_user_id,
            amount,
            TransactionType::Payment,
            description,
        );
        inner.transactions.push(tx.clone());
        info!(to = to_user_id, amount = %amount, "Payment completed");
        Ok(tx)
    }

    /// Credits a completed outgoing payment back, at most once.
    pub fn refund(&self, transaction_id: &str) -> AppResult<Transaction> {
        let mut inner = self.write();
        let Inner {
            wallet,
            transactions,
            refunded,
        } = &mut *inner;

        let wallet = wallet.as_mut().ok_or(CoreError::WalletNotLoaded)?;
        let original = transactions
            .iter()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

        let reject = |reason: &str| CoreError::InvalidTransaction {
            transaction_id: transaction_id.to_string(),
            operation: "refunded".to_string(),
            reason: reason.to_string(),
        };
        if original.kind != TransactionType::Payment {
            return Err(reject("only payments can be refunded").into());
        }
        if original.status != TransactionStatus::Completed {
            return Err(reject("payment did not complete").into());
        }
        if original.from_user_id != wallet.user_id {
            return Err(reject("payment was not made from this wallet").into());
        }
        if refunded.contains(transaction_id) {
            return Err(reject("already refunded").into());
        }

        let amount = original.amount;
        wallet.balance = credit(wallet.balance, amount)?;
        wallet.total_spent = wallet
            .total_spent
            .checked_debit(amount)
            .unwrap_or_else(Money::zero);

        let tx = completed(
            &original.to_user_id,
            &wallet.user_id,
            amount,
            TransactionType::Refund,
            &format!("Refund: {}", original.description),
        );
        refunded.insert(transaction_id.to_string());
        transactions.push(tx.clone());
        info!(transaction_id, amount = %amount, "Payment refunded");
        Ok(tx)
    }

    /// Stores a server-pushed transaction. Duplicate ids are ignored.
    pub fn record_transaction(&self, tx: Transaction) -> bool {
        let mut inner = self.write();
        if inner.transactions.iter().any(|t| t.id == tx.id) {
            return false;
        }
        inner.transactions.push(tx);
        true
    }

    /// Transactions the user sent or received, newest first.
    pub fn transaction_history(&self, user_id: &str) -> Vec<Transaction> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        // Reverse first so equal timestamps keep newest-inserted first
        let mut history: Vec<Transaction> = inner
            .transactions
            .iter()
            .rev()
            .filter(|t| t.involves(user_id))
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        history
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn completed(
    from: &str,
    to: &str,
    amount: Money,
    kind: TransactionType,
    description: &str,
) -> Transaction {
    Transaction {
        id: generate_id(),
        from_user_id: from.to_string(),
        to_user_id: to.to_string(),
        amount,
        kind,
        status: TransactionStatus::Completed,
        description: description.to_string(),
        created_at: Utc::now(),
    }
}
