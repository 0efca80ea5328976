use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::db::Ledger;
use crate::error::{BankingError, Result};
use crate::payments::PaymentService;

pub mod accounts;
pub mod beneficiaries;
pub mod payments;

/// Shared handle set passed to every tool invocation. The ledger handle is
/// injected at startup; nothing here is global.
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub payments: PaymentService,
}

pub type ToolResult = Result<Value>;
type ToolHandler = fn(Arc<AppState>, Value) -> BoxFuture<'static, ToolResult>;

/// Static mapping from tool name to handler, built once at startup.
pub struct ToolRegistry {
    handlers: HashMap<&'static str, ToolHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, ToolHandler> = HashMap::new();

        handlers.insert("list_accounts", |s, a| Box::pin(accounts::list_accounts(s, a)));
        handlers.insert("add_account", |s, a| Box::pin(accounts::add_account(s, a)));
        handlers.insert("add_multiple_accounts", |s, a| {
            Box::pin(accounts::add_multiple_accounts(s, a))
        });
        handlers.insert("get_account_balance", |s, a| {
            Box::pin(accounts::get_account_balance(s, a))
        });
        handlers.insert("get_account_summary", |s, a| {
            Box::pin(accounts::get_account_summary(s, a))
        });
        handlers.insert("add_beneficiary", |s, a| {
            Box::pin(beneficiaries::add_beneficiary(s, a))
        });
        handlers.insert("delete_beneficiary", |s, a| {
            Box::pin(beneficiaries::delete_beneficiary(s, a))
        });
        handlers.insert("search_beneficiaries", |s, a| {
            Box::pin(beneficiaries::search_beneficiaries(s, a))
        });
        handlers.insert("initiate_payment", |s, a| {
            Box::pin(payments::initiate_payment(s, a))
        });
        handlers.insert("schedule_payment", |s, a| {
            Box::pin(payments::schedule_payment(s, a))
        });
        handlers.insert("cancel_payment", |s, a| {
            Box::pin(payments::cancel_payment(s, a))
        });
        handlers.insert("search_payment_history", |s, a| {
            Box::pin(payments::search_payment_history(s, a))
        });
        handlers.insert("get_payment_statistics", |s, a| {
            Box::pin(payments::get_payment_statistics(s, a))
        });

        Self { handlers }
    }

    pub async fn dispatch(&self, name: &str, state: Arc<AppState>, args: Value) -> ToolResult {
        match self.handlers.get(name) {
            Some(handler) => handler(state, args).await,
            None => Err(BankingError::UnknownTool(name.to_string())),
        }
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

async fn call_tool(
    State((state, registry)): State<(Arc<AppState>, Arc<ToolRegistry>)>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> (StatusCode, Json<Value>) {
    tracing::info!(tool = %name, "tool invoked");
    respond(registry.dispatch(&name, state, args).await)
}

async fn list_tools(
    State((_, registry)): State<(Arc<AppState>, Arc<ToolRegistry>)>,
) -> (StatusCode, Json<Value>) {
    respond(Ok(json!(registry.tool_names())))
}

pub(crate) fn respond(result: ToolResult) -> (StatusCode, Json<Value>) {
    match result {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({"status": "success", "result": result})),
        ),
        Err(err) => {
            tracing::error!(kind = err.kind(), "{err}");
            (
                err.status_code(),
                Json(json!({"status": "error", "error": err.kind(), "message": err.to_string()})),
            )
        }
    }
}

pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    // a missing body and an empty argument object mean the same thing
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|err| BankingError::Validation {
        field: "arguments",
        reason: err.to_string(),
    })
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> ToolResult {
    serde_json::to_value(value).map_err(|err| BankingError::Validation {
        field: "result",
        reason: err.to_string(),
    })
}

pub fn router(state: Arc<AppState>, registry: Arc<ToolRegistry>) -> Router {
    Router::new()
        .route("/v1/tools", get(list_tools))
        .route("/v1/tools/:name", post(call_tool))
        .route("/v1/accounts", get(accounts::accounts_resource))
        .route("/v1/accounts/:account_id", get(accounts::account_resource))
        .route(
            "/v1/accounts/:account_id/balance",
            get(accounts::balance_resource),
        )
        .route(
            "/v1/beneficiaries",
            get(beneficiaries::beneficiaries_resource),
        )
        .route("/v1/payments", get(payments::payments_resource))
        .route_layer(CompressionLayer::new().gzip(true))
        .route_layer(RequestBodyLimitLayer::new(1024 * 1024 * 10))
        .with_state((state, registry))
}
