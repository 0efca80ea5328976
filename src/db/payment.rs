use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub beneficiary_id: Uuid,
    pub source_account_id: Uuid,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// An immediate payment, recorded at the moment its debit commits.
    pub fn completed(
        amount: Decimal,
        currency: String,
        beneficiary_id: Uuid,
        source_account_id: Uuid,
        payment_type: PaymentType,
    ) -> Self {
        let now = Utc::now();
        Self {
            payment_id: Uuid::new_v4(),
            amount,
            currency,
            beneficiary_id,
            source_account_id,
            status: PaymentStatus::Completed,
            payment_type,
            scheduled_date: None,
            created_at: now,
            completed_at: Some(now),
        }
    }

    /// A future-dated payment; no funds move until a scheduler promotes it.
    pub fn scheduled(
        amount: Decimal,
        currency: String,
        beneficiary_id: Uuid,
        source_account_id: Uuid,
        scheduled_date: DateTime<Utc>,
    ) -> Self {
        Self {
            payment_id: Uuid::new_v4(),
            amount,
            currency,
            beneficiary_id,
            source_account_id,
            status: PaymentStatus::Scheduled,
            payment_type: PaymentType::Scheduled,
            scheduled_date: Some(scheduled_date),
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    Scheduled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Scheduled => "SCHEDULED",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            "CANCELLED" => Ok(PaymentStatus::Cancelled),
            "SCHEDULED" => Ok(PaymentStatus::Scheduled),
            other => Err(format!("invalid payment status: {other}")),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Transfer,
    BillPayment,
    WireTransfer,
    #[serde(rename = "ACH")]
    Ach,
    CardPayment,
    Immediate,
    Scheduled,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Transfer => "TRANSFER",
            PaymentType::BillPayment => "BILL_PAYMENT",
            PaymentType::WireTransfer => "WIRE_TRANSFER",
            PaymentType::Ach => "ACH",
            PaymentType::CardPayment => "CARD_PAYMENT",
            PaymentType::Immediate => "IMMEDIATE",
            PaymentType::Scheduled => "SCHEDULED",
        }
    }
}

impl std::str::FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRANSFER" => Ok(PaymentType::Transfer),
            "BILL_PAYMENT" => Ok(PaymentType::BillPayment),
            "WIRE_TRANSFER" => Ok(PaymentType::WireTransfer),
            "ACH" => Ok(PaymentType::Ach),
            "CARD_PAYMENT" => Ok(PaymentType::CardPayment),
            "IMMEDIATE" => Ok(PaymentType::Immediate),
            "SCHEDULED" => Ok(PaymentType::Scheduled),
            other => Err(format!("invalid payment type: {other}")),
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunctive payment filter; an absent field matches all rows.
/// Date bounds apply to `created_at`, both ends inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub currency: Option<String>,
    pub status: Option<PaymentStatus>,
    pub payment_type: Option<PaymentType>,
    pub beneficiary_id: Option<Uuid>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        self.start_date.map_or(true, |d| payment.created_at >= d)
            && self.end_date.map_or(true, |d| payment.created_at <= d)
            && self.min_amount.map_or(true, |min| payment.amount >= min)
            && self.max_amount.map_or(true, |max| payment.amount <= max)
            && self.currency.as_ref().map_or(true, |c| &payment.currency == c)
            && self.status.map_or(true, |s| payment.status == s)
            && self.payment_type.map_or(true, |t| payment.payment_type == t)
            && self
                .beneficiary_id
                .map_or(true, |b| payment.beneficiary_id == b)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSortBy {
    #[default]
    CreatedAt,
    Amount,
    ScheduledDate,
}

impl PaymentSortBy {
    pub fn column(&self) -> &'static str {
        match self {
            PaymentSortBy::CreatedAt => "created_at",
            PaymentSortBy::Amount => "amount",
            PaymentSortBy::ScheduledDate => "scheduled_date",
        }
    }
}
