use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::{Ledger, Payment, PaymentStatus, PaymentType};
use crate::error::{BankingError, Result};

/// Currencies the service refuses to move money in unless configured
/// otherwise (`BLOCKED_CURRENCIES`).
pub const DEFAULT_BLOCKED_CURRENCIES: &[&str] = &["RUB", "SYP", "IRR", "VES", "SDG", "CUP"];

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub currency: String,
    pub beneficiary_id: Uuid,
    pub source_account_id: Uuid,
}

/// Orchestrates payment initiation, scheduling and cancellation.
///
/// Every failure before the commit step leaves the store untouched; the
/// commit itself is delegated to the ledger's one atomic operation, so a
/// payment is either fully applied (debit + record) or not at all.
pub struct PaymentService {
    ledger: Arc<dyn Ledger>,
    blocked_currencies: HashSet<String>,
}

impl PaymentService {
    pub fn new(ledger: Arc<dyn Ledger>, blocked_currencies: HashSet<String>) -> Self {
        Self {
            ledger,
            blocked_currencies,
        }
    }

    /// Run an immediate payment to completion: verify the beneficiary and
    /// the source account, check funds, then debit and record atomically.
    pub async fn initiate(
        &self,
        request: PaymentRequest,
        payment_type: PaymentType,
    ) -> Result<Payment> {
        validate(&request)?;
        self.verify_parties(&request).await?;

        let account = self
            .ledger
            .get_account(request.source_account_id)
            .await?
            .ok_or(BankingError::AccountNotFound(request.source_account_id))?;

        if account.balance < request.amount {
            tracing::warn!(
                account_id = %account.account_id,
                available = %account.balance,
                required = %request.amount,
                "payment rejected, insufficient funds"
            );
            return Err(BankingError::InsufficientFunds {
                available: account.balance,
                required: request.amount,
            });
        }

        let payment = Payment::completed(
            request.amount,
            request.currency,
            request.beneficiary_id,
            request.source_account_id,
            payment_type,
        );
        self.ledger
            .commit_payment(request.source_account_id, &payment)
            .await?;

        tracing::info!(
            payment_id = %payment.payment_id,
            account_id = %request.source_account_id,
            amount = %payment.amount,
            currency = %payment.currency,
            "payment committed"
        );
        Ok(payment)
    }

    /// Persist a future-dated payment. No funds move until a scheduler
    /// promotes it through the immediate path.
    pub async fn schedule(
        &self,
        request: PaymentRequest,
        scheduled_date: DateTime<Utc>,
    ) -> Result<Payment> {
        validate(&request)?;
        if scheduled_date <= Utc::now() {
            return Err(BankingError::Validation {
                field: "scheduled_date",
                reason: format!("{scheduled_date} is not in the future"),
            });
        }
        self.verify_parties(&request).await?;

        // the source account must exist even though it is not debited yet
        self.ledger
            .get_account(request.source_account_id)
            .await?
            .ok_or(BankingError::AccountNotFound(request.source_account_id))?;

        let payment = Payment::scheduled(
            request.amount,
            request.currency,
            request.beneficiary_id,
            request.source_account_id,
            scheduled_date,
        );
        let inserted = self.ledger.insert_payment(&payment).await?;
        if inserted != 1 {
            return Err(BankingError::TransactionIntegrity { affected: inserted });
        }

        tracing::info!(
            payment_id = %payment.payment_id,
            scheduled_date = %scheduled_date,
            "payment scheduled"
        );
        Ok(payment)
    }

    /// Cancel a scheduled payment. The status swap is a compare-and-swap so
    /// a payment can never be cancelled twice, even under concurrent calls.
    pub async fn cancel(&self, payment_id: Uuid) -> Result<Payment> {
        let payment = self
            .ledger
            .get_payment(payment_id)
            .await?
            .ok_or(BankingError::PaymentNotFound(payment_id))?;

        if payment.status != PaymentStatus::Scheduled {
            return Err(BankingError::InvalidStateTransition(payment.status));
        }

        let swapped = self
            .ledger
            .update_payment_status(payment_id, PaymentStatus::Scheduled, PaymentStatus::Cancelled)
            .await?;
        if swapped != 1 {
            // someone else transitioned it between our read and the swap
            let current = self
                .ledger
                .get_payment(payment_id)
                .await?
                .ok_or(BankingError::PaymentNotFound(payment_id))?;
            return Err(BankingError::InvalidStateTransition(current.status));
        }

        tracing::info!(payment_id = %payment_id, "payment cancelled");
        Ok(Payment {
            status: PaymentStatus::Cancelled,
            ..payment
        })
    }

    async fn verify_parties(&self, request: &PaymentRequest) -> Result<()> {
        self.ledger
            .get_beneficiary(request.beneficiary_id)
            .await?
            .ok_or(BankingError::BeneficiaryNotFound(request.beneficiary_id))?;

        if self.blocked_currencies.contains(&request.currency) {
            tracing::warn!(currency = %request.currency, "payment rejected, currency blocked");
            return Err(BankingError::PaymentBlocked(request.currency.clone()));
        }
        Ok(())
    }
}

fn validate(request: &PaymentRequest) -> Result<()> {
    if request.amount <= Decimal::ZERO {
        return Err(BankingError::Validation {
            field: "amount",
            reason: format!("{} is not positive", request.amount),
        });
    }
    validate_currency(&request.currency)
}

pub(crate) fn validate_currency(code: &str) -> Result<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(BankingError::Validation {
            field: "currency",
            reason: format!("{code:?} is not a 3-letter uppercase code"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(amount: Decimal, currency: &str) -> PaymentRequest {
        PaymentRequest {
            amount,
            currency: currency.to_string(),
            beneficiary_id: Uuid::new_v4(),
            source_account_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(matches!(
            validate(&request(dec!(0), "USD")),
            Err(BankingError::Validation { field: "amount", .. })
        ));
        assert!(matches!(
            validate(&request(dec!(-5.00), "USD")),
            Err(BankingError::Validation { field: "amount", .. })
        ));
    }

    #[test]
    fn rejects_malformed_currency_codes() {
        for currency in ["usd", "US", "USDX", "U$D", ""] {
            assert!(matches!(
                validate(&request(dec!(1.00), currency)),
                Err(BankingError::Validation { field: "currency", .. })
            ));
        }
        assert!(validate(&request(dec!(1.00), "USD")).is_ok());
    }
}
