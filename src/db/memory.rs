use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{BankingError, Result};

use super::account::{Account, AccountFilter, AccountSortBy, SortOrder};
use super::beneficiary::{Beneficiary, BeneficiaryFilter};
use super::payment::{Payment, PaymentFilter, PaymentSortBy, PaymentStatus};
use super::Ledger;

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    beneficiaries: HashMap<Uuid, Beneficiary>,
    payments: HashMap<Uuid, Payment>,
}

/// In-process ledger used by the test suite.
///
/// All three maps sit behind one lock, so `commit_payment` performs its
/// check-and-debit and the payment insert as a single atomic step — the same
/// observable contract the SQL transaction gives `PgLedger`.
#[derive(Default, Clone)]
pub struct MemoryLedger {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K, order: SortOrder, id: impl Fn(&T) -> Uuid) -> Vec<T> {
    items.sort_by(|a, b| {
        let by_key = match order {
            SortOrder::Asc => key(a).cmp(&key(b)),
            SortOrder::Desc => key(b).cmp(&key(a)),
        };
        // ties break on the id, ascending, like the SQL orderings
        by_key.then_with(|| id(a).cmp(&id(b)))
    });
    items
}

#[async_trait::async_trait]
impl Ledger for MemoryLedger {
    async fn insert_account(&self, account: &Account) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        inner.accounts.insert(account.account_id, account.clone());
        Ok(1)
    }

    async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>> {
        let inner = self.inner.lock().await;
        Ok(inner.accounts.get(&account_id).cloned())
    }

    async fn list_accounts(
        &self,
        filter: &AccountFilter,
        sort_by: AccountSortBy,
        order: SortOrder,
    ) -> Result<Vec<Account>> {
        let inner = self.inner.lock().await;
        let accounts: Vec<Account> = inner
            .accounts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();

        Ok(match sort_by {
            AccountSortBy::Balance => {
                sorted(accounts, |a| a.balance, order, |a| a.account_id)
            }
            AccountSortBy::CreatedAt => {
                sorted(accounts, |a| a.created_at, order, |a| a.account_id)
            }
            AccountSortBy::AccountType => {
                sorted(accounts, |a| a.account_type.as_str(), order, |a| a.account_id)
            }
        })
    }

    async fn insert_beneficiary(&self, beneficiary: &Beneficiary) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        inner
            .beneficiaries
            .insert(beneficiary.beneficiary_id, beneficiary.clone());
        Ok(1)
    }

    async fn get_beneficiary(&self, beneficiary_id: Uuid) -> Result<Option<Beneficiary>> {
        let inner = self.inner.lock().await;
        Ok(inner.beneficiaries.get(&beneficiary_id).cloned())
    }

    async fn delete_beneficiary(&self, beneficiary_id: Uuid) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        if inner
            .payments
            .values()
            .any(|p| p.beneficiary_id == beneficiary_id)
        {
            return Err(BankingError::BeneficiaryInUse(beneficiary_id));
        }
        Ok(inner.beneficiaries.remove(&beneficiary_id).map_or(0, |_| 1))
    }

    async fn list_beneficiaries(&self, filter: &BeneficiaryFilter) -> Result<Vec<Beneficiary>> {
        let inner = self.inner.lock().await;
        let beneficiaries: Vec<Beneficiary> = inner
            .beneficiaries
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        Ok(sorted(
            beneficiaries,
            |b| b.created_at,
            SortOrder::Asc,
            |b| b.beneficiary_id,
        ))
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        inner.payments.insert(payment.payment_id, payment.clone());
        Ok(1)
    }

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>> {
        let inner = self.inner.lock().await;
        Ok(inner.payments.get(&payment_id).cloned())
    }

    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        sort_by: PaymentSortBy,
        order: SortOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Payment>> {
        let inner = self.inner.lock().await;
        let payments: Vec<Payment> = inner
            .payments
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();

        let mut payments = match sort_by {
            PaymentSortBy::CreatedAt => {
                sorted(payments, |p| p.created_at, order, |p| p.payment_id)
            }
            PaymentSortBy::Amount => sorted(payments, |p| p.amount, order, |p| p.payment_id),
            PaymentSortBy::ScheduledDate => {
                sorted(payments, |p| p.scheduled_date, order, |p| p.payment_id)
            }
        };

        if let Some(limit) = limit {
            payments.truncate(limit.max(0) as usize);
        }
        Ok(payments)
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        match inner.payments.get_mut(&payment_id) {
            Some(payment) if payment.status == from => {
                payment.status = to;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn commit_payment(&self, source_account_id: Uuid, payment: &Payment) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let balance = match inner.accounts.get(&source_account_id) {
            Some(account) => account.balance,
            None => return Err(BankingError::TransactionIntegrity { affected: 0 }),
        };
        if balance < payment.amount {
            return Err(BankingError::InsufficientFunds {
                available: balance,
                required: payment.amount,
            });
        }

        // both effects apply under the same lock guard
        if let Some(account) = inner.accounts.get_mut(&source_account_id) {
            account.balance -= payment.amount;
        }
        inner.payments.insert(payment.payment_id, payment.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::account::AccountType;
    use crate::db::payment::PaymentType;
    use rust_decimal_macros::dec;

    fn checking(balance: rust_decimal::Decimal) -> Account {
        Account::new(AccountType::Checking, balance, "USD".to_string())
    }

    #[tokio::test]
    async fn account_round_trip() {
        let ledger = MemoryLedger::new();
        let account = checking(dec!(100.00));

        assert_eq!(ledger.insert_account(&account).await.unwrap(), 1);
        let found = ledger.get_account(account.account_id).await.unwrap().unwrap();
        assert_eq!(found, account);

        assert!(ledger.get_account(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_debits_and_records_atomically() {
        let ledger = MemoryLedger::new();
        let account = checking(dec!(100.00));
        ledger.insert_account(&account).await.unwrap();

        let payment = Payment::completed(
            dec!(60.00),
            "USD".to_string(),
            Uuid::new_v4(),
            account.account_id,
            PaymentType::Immediate,
        );
        ledger
            .commit_payment(account.account_id, &payment)
            .await
            .unwrap();

        let found = ledger.get_account(account.account_id).await.unwrap().unwrap();
        assert_eq!(found.balance, dec!(40.00));
        assert!(ledger
            .get_payment(payment.payment_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn commit_rejects_short_balance_without_side_effects() {
        let ledger = MemoryLedger::new();
        let account = checking(dec!(50.00));
        ledger.insert_account(&account).await.unwrap();

        let payment = Payment::completed(
            dec!(60.00),
            "USD".to_string(),
            Uuid::new_v4(),
            account.account_id,
            PaymentType::Immediate,
        );
        let err = ledger
            .commit_payment(account.account_id, &payment)
            .await
            .unwrap_err();
        assert!(matches!(err, BankingError::InsufficientFunds { .. }));

        let found = ledger.get_account(account.account_id).await.unwrap().unwrap();
        assert_eq!(found.balance, dec!(50.00));
        assert!(ledger
            .get_payment(payment.payment_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn status_swap_requires_expected_current_status() {
        let ledger = MemoryLedger::new();
        let payment = Payment::scheduled(
            dec!(10.00),
            "USD".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            chrono::Utc::now() + chrono::Duration::days(1),
        );
        ledger.insert_payment(&payment).await.unwrap();

        let swapped = ledger
            .update_payment_status(
                payment.payment_id,
                PaymentStatus::Scheduled,
                PaymentStatus::Cancelled,
            )
            .await
            .unwrap();
        assert_eq!(swapped, 1);

        // second swap sees CANCELLED, not SCHEDULED
        let swapped = ledger
            .update_payment_status(
                payment.payment_id,
                PaymentStatus::Scheduled,
                PaymentStatus::Cancelled,
            )
            .await
            .unwrap();
        assert_eq!(swapped, 0);
    }

    #[tokio::test]
    async fn delete_beneficiary_with_payments_is_refused() {
        let ledger = MemoryLedger::new();
        let beneficiary = Beneficiary::new(
            "Acme Corp".to_string(),
            "DE89370400440532013000".to_string(),
            "COBADEFF".to_string(),
        );
        ledger.insert_beneficiary(&beneficiary).await.unwrap();

        let payment = Payment::completed(
            dec!(5.00),
            "EUR".to_string(),
            beneficiary.beneficiary_id,
            Uuid::new_v4(),
            PaymentType::Immediate,
        );
        ledger.insert_payment(&payment).await.unwrap();

        let err = ledger
            .delete_beneficiary(beneficiary.beneficiary_id)
            .await
            .unwrap_err();
        assert!(matches!(err, BankingError::BeneficiaryInUse(_)));
    }
}
