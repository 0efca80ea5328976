use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

pub mod account;
pub mod beneficiary;
pub mod memory;
pub mod payment;
pub mod postgres;

pub use account::{Account, AccountFilter, AccountSortBy, AccountType, SortOrder};
pub use beneficiary::{Beneficiary, BeneficiaryFilter};
pub use memory::MemoryLedger;
pub use payment::{Payment, PaymentFilter, PaymentSortBy, PaymentStatus, PaymentType};
pub use postgres::PgLedger;

/// Typed read/write operations over the ledger store.
///
/// Writes either return the number of affected rows or verify it internally;
/// a write that affects an unexpected number of rows is always surfaced as an
/// error, never silently ignored. `commit_payment` is the one operation that
/// spans multiple writes and it is atomic: the debit and the payment insert
/// both happen or neither does.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn insert_account(&self, account: &Account) -> Result<u64>;
    async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>>;
    async fn list_accounts(
        &self,
        filter: &AccountFilter,
        sort_by: AccountSortBy,
        order: SortOrder,
    ) -> Result<Vec<Account>>;

    async fn insert_beneficiary(&self, beneficiary: &Beneficiary) -> Result<u64>;
    async fn get_beneficiary(&self, beneficiary_id: Uuid) -> Result<Option<Beneficiary>>;
    async fn delete_beneficiary(&self, beneficiary_id: Uuid) -> Result<u64>;
    async fn list_beneficiaries(&self, filter: &BeneficiaryFilter) -> Result<Vec<Beneficiary>>;

    async fn insert_payment(&self, payment: &Payment) -> Result<u64>;
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>>;
    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        sort_by: PaymentSortBy,
        order: SortOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Payment>>;

    /// Compare-and-swap on payment status. Affects 0 rows when the payment
    /// is missing or no longer in `from`, so callers can detect a lost race.
    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<u64>;

    /// Debit `payment.amount` from the source account and record the payment,
    /// atomically. The debit is conditional on the balance still covering the
    /// amount, so two concurrent commits against the same account can never
    /// both pass the funds check against a stale balance.
    async fn commit_payment(&self, source_account_id: Uuid, payment: &Payment) -> Result<()>;
}
