use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub beneficiary_id: Uuid,
    pub name: String,
    pub account_number: String,
    pub bank_code: String,
    pub created_at: DateTime<Utc>,
}

impl Beneficiary {
    pub fn new(name: String, account_number: String, bank_code: String) -> Self {
        Self {
            beneficiary_id: Uuid::new_v4(),
            name,
            account_number,
            bank_code,
            created_at: Utc::now(),
        }
    }
}

/// Name matches case-insensitively on a substring, bank code exactly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeneficiaryFilter {
    pub name: Option<String>,
    pub bank_code: Option<String>,
}

impl BeneficiaryFilter {
    pub fn matches(&self, beneficiary: &Beneficiary) -> bool {
        self.name.as_ref().map_or(true, |n| {
            beneficiary.name.to_lowercase().contains(&n.to_lowercase())
        }) && self
            .bank_code
            .as_ref()
            .map_or(true, |b| &beneficiary.bank_code == b)
    }
}
