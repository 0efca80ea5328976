use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use openbanking_service::db::{Account, AccountType, Beneficiary, Ledger, MemoryLedger};
use openbanking_service::payments::{PaymentService, DEFAULT_BLOCKED_CURRENCIES};
use openbanking_service::routes::AppState;

pub fn blocked_currencies() -> HashSet<String> {
    DEFAULT_BLOCKED_CURRENCIES
        .iter()
        .map(|code| code.to_string())
        .collect()
}

/// A fresh app state over an empty in-memory ledger.
pub fn test_state() -> Arc<AppState> {
    let ledger = Arc::new(MemoryLedger::new());
    Arc::new(AppState {
        ledger: ledger.clone(),
        payments: PaymentService::new(ledger, blocked_currencies()),
    })
}

pub async fn seed_account(state: &AppState, balance: Decimal, currency: &str) -> Uuid {
    let account = Account::new(AccountType::Checking, balance, currency.to_string());
    state.ledger.insert_account(&account).await.unwrap();
    account.account_id
}

pub async fn seed_beneficiary(state: &AppState, name: &str) -> Uuid {
    let beneficiary = Beneficiary::new(
        name.to_string(),
        "GB29NWBK60161331926819".to_string(),
        "NWBKGB2L".to_string(),
    );
    state.ledger.insert_beneficiary(&beneficiary).await.unwrap();
    beneficiary.beneficiary_id
}
