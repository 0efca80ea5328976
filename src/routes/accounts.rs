use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{Account, AccountFilter, AccountSortBy, AccountType, Ledger, SortOrder};
use crate::error::{BankingError, Result};

use super::{parse_args, respond, to_json, AppState, ToolRegistry, ToolResult};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListAccounts {
    account_type: Option<AccountType>,
    currency: Option<String>,
    min_balance: Option<Decimal>,
    max_balance: Option<Decimal>,
    sort_by: AccountSortBy,
    sort_order: SortOrder,
}

pub async fn list_accounts(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: ListAccounts = parse_args(args)?;
    let filter = AccountFilter {
        account_type: req.account_type,
        currency: req.currency,
        min_balance: req.min_balance,
        max_balance: req.max_balance,
    };
    let accounts = state
        .ledger
        .list_accounts(&filter, req.sort_by, req.sort_order)
        .await?;
    to_json(&accounts)
}

#[derive(Debug, Deserialize)]
pub struct AddAccount {
    account_type: AccountType,
    balance: Decimal,
    currency: String,
}

pub async fn add_account(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: AddAccount = parse_args(args)?;
    let account = create_account(&state, req).await?;
    tracing::info!(account_id = %account.account_id, "account created");
    to_json(&account)
}

#[derive(Debug, Deserialize)]
pub struct AddMultipleAccounts {
    accounts: Vec<AddAccount>,
}

pub async fn add_multiple_accounts(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: AddMultipleAccounts = parse_args(args)?;
    let mut created = Vec::with_capacity(req.accounts.len());
    for account in req.accounts {
        created.push(create_account(&state, account).await?);
    }
    tracing::info!(count = created.len(), "accounts created");
    to_json(&created)
}

async fn create_account(state: &AppState, req: AddAccount) -> Result<Account> {
    if req.balance < Decimal::ZERO {
        return Err(BankingError::Validation {
            field: "balance",
            reason: format!("{} is negative", req.balance),
        });
    }
    crate::payments::validate_currency(&req.currency)?;

    let account = Account::new(req.account_type, req.balance, req.currency);
    let inserted = state.ledger.insert_account(&account).await?;
    if inserted != 1 {
        return Err(BankingError::TransactionIntegrity { affected: inserted });
    }
    Ok(account)
}

#[derive(Debug, Deserialize)]
pub struct GetAccountBalance {
    account_id: Uuid,
}

pub async fn get_account_balance(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: GetAccountBalance = parse_args(args)?;
    let account = state
        .ledger
        .get_account(req.account_id)
        .await?
        .ok_or(BankingError::AccountNotFound(req.account_id))?;

    Ok(json!({
        "account_id": account.account_id,
        "balance": account.balance,
        "currency": account.currency,
    }))
}

pub async fn get_account_summary(state: Arc<AppState>, _args: Value) -> ToolResult {
    let accounts = state
        .ledger
        .list_accounts(
            &AccountFilter::default(),
            AccountSortBy::CreatedAt,
            SortOrder::Asc,
        )
        .await?;

    let mut balance_by_currency: HashMap<String, Decimal> = HashMap::new();
    let mut accounts_by_type: HashMap<&'static str, u64> = HashMap::new();
    for account in &accounts {
        *balance_by_currency
            .entry(account.currency.clone())
            .or_default() += account.balance;
        *accounts_by_type
            .entry(account.account_type.as_str())
            .or_default() += 1;
    }

    Ok(json!({
        "total_accounts": accounts.len(),
        "balance_by_currency": balance_by_currency,
        "accounts_by_type": accounts_by_type,
    }))
}

pub async fn accounts_resource(
    State((state, _)): State<(Arc<AppState>, Arc<ToolRegistry>)>,
) -> (StatusCode, Json<Value>) {
    let accounts = state
        .ledger
        .list_accounts(
            &AccountFilter::default(),
            AccountSortBy::CreatedAt,
            SortOrder::Asc,
        )
        .await;
    respond(accounts.and_then(|accounts| to_json(&accounts)))
}

pub async fn account_resource(
    State((state, _)): State<(Arc<AppState>, Arc<ToolRegistry>)>,
    Path(account_id): Path<Uuid>,
) -> (StatusCode, Json<Value>) {
    let result = state.ledger.get_account(account_id).await.and_then(|row| {
        row.ok_or(BankingError::AccountNotFound(account_id))
            .and_then(|account| to_json(&account))
    });
    respond(result)
}

pub async fn balance_resource(
    State((state, _)): State<(Arc<AppState>, Arc<ToolRegistry>)>,
    Path(account_id): Path<Uuid>,
) -> (StatusCode, Json<Value>) {
    respond(get_account_balance(state, json!({"account_id": account_id})).await)
}
