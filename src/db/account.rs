use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: Uuid,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(account_type: AccountType, balance: Decimal, currency: String) -> Self {
        Self {
            account_id: Uuid::new_v4(),
            account_type,
            balance,
            currency,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,
    Checking,
    Investment,
    FixedDeposit,
    Loan,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "SAVINGS",
            AccountType::Checking => "CHECKING",
            AccountType::Investment => "INVESTMENT",
            AccountType::FixedDeposit => "FIXED_DEPOSIT",
            AccountType::Loan => "LOAN",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAVINGS" => Ok(AccountType::Savings),
            "CHECKING" => Ok(AccountType::Checking),
            "INVESTMENT" => Ok(AccountType::Investment),
            "FIXED_DEPOSIT" => Ok(AccountType::FixedDeposit),
            "LOAN" => Ok(AccountType::Loan),
            other => Err(format!("invalid account type: {other}")),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conjunctive account filter; an absent field matches all rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountFilter {
    pub account_type: Option<AccountType>,
    pub currency: Option<String>,
    pub min_balance: Option<Decimal>,
    pub max_balance: Option<Decimal>,
}

impl AccountFilter {
    pub fn matches(&self, account: &Account) -> bool {
        self.account_type.map_or(true, |t| account.account_type == t)
            && self.currency.as_ref().map_or(true, |c| &account.currency == c)
            && self.min_balance.map_or(true, |min| account.balance >= min)
            && self.max_balance.map_or(true, |max| account.balance <= max)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSortBy {
    #[default]
    Balance,
    CreatedAt,
    AccountType,
}

impl AccountSortBy {
    pub fn column(&self) -> &'static str {
        match self {
            AccountSortBy::Balance => "balance",
            AccountSortBy::CreatedAt => "created_at",
            AccountSortBy::AccountType => "account_type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}
