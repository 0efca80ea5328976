use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::{Ledger, PaymentFilter, PaymentSortBy, PaymentStatus, PaymentType, SortOrder};
use crate::error::BankingError;
use crate::payments::PaymentRequest;

use super::{parse_args, respond, to_json, AppState, ToolRegistry, ToolResult};

#[derive(Debug, Deserialize)]
pub struct InitiatePayment {
    amount: Decimal,
    currency: String,
    beneficiary_id: Uuid,
    source_account_id: Uuid,
    #[serde(default)]
    payment_type: Option<PaymentType>,
}

pub async fn initiate_payment(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: InitiatePayment = parse_args(args)?;
    let payment = state
        .payments
        .initiate(
            PaymentRequest {
                amount: req.amount,
                currency: req.currency,
                beneficiary_id: req.beneficiary_id,
                source_account_id: req.source_account_id,
            },
            req.payment_type.unwrap_or(PaymentType::Immediate),
        )
        .await?;
    to_json(&payment)
}

#[derive(Debug, Deserialize)]
pub struct SchedulePayment {
    amount: Decimal,
    currency: String,
    beneficiary_id: Uuid,
    source_account_id: Uuid,
    scheduled_date: DateTime<Utc>,
}

pub async fn schedule_payment(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: SchedulePayment = parse_args(args)?;
    let payment = state
        .payments
        .schedule(
            PaymentRequest {
                amount: req.amount,
                currency: req.currency,
                beneficiary_id: req.beneficiary_id,
                source_account_id: req.source_account_id,
            },
            req.scheduled_date,
        )
        .await?;
    to_json(&payment)
}

#[derive(Debug, Deserialize)]
pub struct CancelPayment {
    payment_id: Uuid,
}

pub async fn cancel_payment(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: CancelPayment = parse_args(args)?;
    let payment = state.payments.cancel(req.payment_id).await?;
    to_json(&payment)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchPaymentHistory {
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    min_amount: Option<Decimal>,
    max_amount: Option<Decimal>,
    currency: Option<String>,
    status: Option<PaymentStatus>,
    payment_type: Option<PaymentType>,
    beneficiary_id: Option<Uuid>,
    sort_by: PaymentSortBy,
    sort_order: SortOrder,
    limit: Option<i64>,
}

pub async fn search_payment_history(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: SearchPaymentHistory = parse_args(args)?;
    if req.limit.is_some_and(|limit| limit < 0) {
        return Err(BankingError::Validation {
            field: "limit",
            reason: "must not be negative".to_string(),
        });
    }

    let filter = PaymentFilter {
        start_date: req.start_date,
        end_date: req.end_date,
        min_amount: req.min_amount,
        max_amount: req.max_amount,
        currency: req.currency,
        status: req.status,
        payment_type: req.payment_type,
        beneficiary_id: req.beneficiary_id,
    };
    let payments = state
        .ledger
        .list_payments(&filter, req.sort_by, req.sort_order, req.limit)
        .await?;
    to_json(&payments)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GetPaymentStatistics {
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
}

pub async fn get_payment_statistics(state: Arc<AppState>, args: Value) -> ToolResult {
    let req: GetPaymentStatistics = parse_args(args)?;
    let filter = PaymentFilter {
        start_date: req.start_date,
        end_date: req.end_date,
        ..PaymentFilter::default()
    };
    let payments = state
        .ledger
        .list_payments(&filter, PaymentSortBy::CreatedAt, SortOrder::Asc, None)
        .await?;

    let total_amount: Decimal = payments.iter().map(|p| p.amount).sum();
    let mut status_breakdown: HashMap<&'static str, u64> = HashMap::new();
    let mut currency_breakdown: HashMap<String, Decimal> = HashMap::new();
    let mut type_breakdown: HashMap<&'static str, u64> = HashMap::new();
    for payment in &payments {
        *status_breakdown.entry(payment.status.as_str()).or_default() += 1;
        *currency_breakdown
            .entry(payment.currency.clone())
            .or_default() += payment.amount;
        *type_breakdown
            .entry(payment.payment_type.as_str())
            .or_default() += 1;
    }

    Ok(json!({
        "total_payments": payments.len(),
        "total_amount": total_amount,
        "status_breakdown": status_breakdown,
        "currency_breakdown": currency_breakdown,
        "type_breakdown": type_breakdown,
        "period": {
            "start": req.start_date,
            "end": req.end_date,
        },
    }))
}

pub async fn payments_resource(
    State((state, _)): State<(Arc<AppState>, Arc<ToolRegistry>)>,
) -> (StatusCode, Json<Value>) {
    let result = state
        .ledger
        .list_payments(
            &PaymentFilter::default(),
            PaymentSortBy::CreatedAt,
            SortOrder::Desc,
            None,
        )
        .await
        .and_then(|payments| to_json(&payments));
    respond(result)
}
