use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{Beneficiary, BeneficiaryFilter, Ledger};
use crate::error::BankingError;

use super::{parse_args, respond, to_json, AppState, ToolRegistry, ToolResult};

#[derive(Debug, Deserialize)]
pub struct AddBeneficiary {
    name: String,
    account_number: String,
    bank_code: String,
}

pub async fn add_beneficiary(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: AddBeneficiary = parse_args(args)?;
    if req.name.trim().is_empty() {
        return Err(BankingError::Validation {
            field: "name",
            reason: "must not be empty".to_string(),
        });
    }

    let beneficiary = Beneficiary::new(req.name, req.account_number, req.bank_code);
    let inserted = state.ledger.insert_beneficiary(&beneficiary).await?;
    if inserted != 1 {
        return Err(BankingError::TransactionIntegrity { affected: inserted });
    }

    tracing::info!(beneficiary_id = %beneficiary.beneficiary_id, "beneficiary created");
    to_json(&beneficiary)
}

#[derive(Debug, Deserialize)]
pub struct DeleteBeneficiary {
    beneficiary_id: Uuid,
}

pub async fn delete_beneficiary(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: DeleteBeneficiary = parse_args(args)?;
    let deleted = state.ledger.delete_beneficiary(req.beneficiary_id).await?;
    if deleted == 0 {
        return Err(BankingError::BeneficiaryNotFound(req.beneficiary_id));
    }

    tracing::info!(beneficiary_id = %req.beneficiary_id, "beneficiary deleted");
    Ok(json!({"deleted": req.beneficiary_id}))
}

pub async fn search_beneficiaries(state: Arc<AppState>, args: Value) -> ToolResult {
    let filter: BeneficiaryFilter = parse_args(args)?;
    let beneficiaries = state.ledger.list_beneficiaries(&filter).await?;
    to_json(&beneficiaries)
}

pub async fn beneficiaries_resource(
    State((state, _)): State<(Arc<AppState>, Arc<ToolRegistry>)>,
) -> (StatusCode, Json<Value>) {
    let result = state
        .ledger
        .list_beneficiaries(&BeneficiaryFilter::default())
        .await
        .and_then(|beneficiaries| to_json(&beneficiaries));
    respond(result)
}
