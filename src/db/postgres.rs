use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::error::{BankingError, Result};

use super::account::{Account, AccountFilter, AccountSortBy, SortOrder};
use super::beneficiary::{Beneficiary, BeneficiaryFilter};
use super::payment::{Payment, PaymentFilter, PaymentSortBy, PaymentStatus};
use super::Ledger;

/// Ledger backed by PostgreSQL. All queries are bound at runtime so the
/// crate builds without a live database; schema lives in `migrations/`.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &PgRow) -> sqlx::Result<Account> {
    let account_type: String = row.try_get("account_type")?;
    Ok(Account {
        account_id: row.try_get("account_id")?,
        account_type: account_type
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        balance: row.try_get("balance")?,
        currency: row.try_get("currency")?,
        created_at: row.try_get("created_at")?,
    })
}

fn beneficiary_from_row(row: &PgRow) -> sqlx::Result<Beneficiary> {
    Ok(Beneficiary {
        beneficiary_id: row.try_get("beneficiary_id")?,
        name: row.try_get("name")?,
        account_number: row.try_get("account_number")?,
        bank_code: row.try_get("bank_code")?,
        created_at: row.try_get("created_at")?,
    })
}

fn payment_from_row(row: &PgRow) -> sqlx::Result<Payment> {
    let status: String = row.try_get("status")?;
    let payment_type: String = row.try_get("type")?;
    Ok(Payment {
        payment_id: row.try_get("payment_id")?,
        amount: row.try_get("amount")?,
        currency: row.try_get("currency")?,
        beneficiary_id: row.try_get("beneficiary_id")?,
        source_account_id: row.try_get("source_account_id")?,
        status: status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        payment_type: payment_type
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        scheduled_date: row.try_get("scheduled_date")?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

#[async_trait::async_trait]
impl Ledger for PgLedger {
    async fn insert_account(&self, account: &Account) -> Result<u64> {
        let done = sqlx::query(
            "INSERT INTO accounts (account_id, account_type, balance, currency, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(account.account_id)
        .bind(account.account_type.as_str())
        .bind(account.balance)
        .bind(&account.currency)
        .bind(account.created_at)
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected())
    }

    async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT account_id, account_type, balance, currency, created_at \
             FROM accounts WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn list_accounts(
        &self,
        filter: &AccountFilter,
        sort_by: AccountSortBy,
        order: SortOrder,
    ) -> Result<Vec<Account>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT account_id, account_type, balance, currency, created_at FROM accounts WHERE 1 = 1",
        );
        if let Some(account_type) = filter.account_type {
            qb.push(" AND account_type = ").push_bind(account_type.as_str());
        }
        if let Some(currency) = &filter.currency {
            qb.push(" AND currency = ").push_bind(currency.clone());
        }
        if let Some(min_balance) = filter.min_balance {
            qb.push(" AND balance >= ").push_bind(min_balance);
        }
        if let Some(max_balance) = filter.max_balance {
            qb.push(" AND balance <= ").push_bind(max_balance);
        }
        // pk tiebreak keeps the ordering stable across equal sort keys
        qb.push(format!(
            " ORDER BY {} {}, account_id ASC",
            sort_by.column(),
            order.sql()
        ));

        let rows = qb.build().fetch_all(&self.pool).await?;
        let accounts = rows
            .iter()
            .map(account_from_row)
            .collect::<sqlx::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    async fn insert_beneficiary(&self, beneficiary: &Beneficiary) -> Result<u64> {
        let done = sqlx::query(
            "INSERT INTO beneficiaries (beneficiary_id, name, account_number, bank_code, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(beneficiary.beneficiary_id)
        .bind(&beneficiary.name)
        .bind(&beneficiary.account_number)
        .bind(&beneficiary.bank_code)
        .bind(beneficiary.created_at)
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected())
    }

    async fn get_beneficiary(&self, beneficiary_id: Uuid) -> Result<Option<Beneficiary>> {
        let row = sqlx::query(
            "SELECT beneficiary_id, name, account_number, bank_code, created_at \
             FROM beneficiaries WHERE beneficiary_id = $1",
        )
        .bind(beneficiary_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(beneficiary_from_row).transpose()?)
    }

    async fn delete_beneficiary(&self, beneficiary_id: Uuid) -> Result<u64> {
        let done = sqlx::query("DELETE FROM beneficiaries WHERE beneficiary_id = $1")
            .bind(beneficiary_id)
            .execute(&self.pool)
            .await;

        match done {
            Ok(done) => Ok(done.rows_affected()),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(BankingError::BeneficiaryInUse(beneficiary_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_beneficiaries(&self, filter: &BeneficiaryFilter) -> Result<Vec<Beneficiary>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT beneficiary_id, name, account_number, bank_code, created_at \
             FROM beneficiaries WHERE 1 = 1",
        );
        if let Some(name) = &filter.name {
            qb.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
        }
        if let Some(bank_code) = &filter.bank_code {
            qb.push(" AND bank_code = ").push_bind(bank_code.clone());
        }
        qb.push(" ORDER BY created_at ASC, beneficiary_id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let beneficiaries = rows
            .iter()
            .map(beneficiary_from_row)
            .collect::<sqlx::Result<Vec<_>>>()?;
        Ok(beneficiaries)
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<u64> {
        let done = insert_payment_query(payment).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query(
            "SELECT payment_id, amount, currency, beneficiary_id, source_account_id, \
                    status, type, scheduled_date, created_at, completed_at \
             FROM payments WHERE payment_id = $1",
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(payment_from_row).transpose()?)
    }

    async fn list_payments(
        &self,
        filter: &PaymentFilter,
        sort_by: PaymentSortBy,
        order: SortOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Payment>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT payment_id, amount, currency, beneficiary_id, source_account_id, \
                    status, type, scheduled_date, created_at, completed_at \
             FROM payments WHERE 1 = 1",
        );
        if let Some(start_date) = filter.start_date {
            qb.push(" AND created_at >= ").push_bind(start_date);
        }
        if let Some(end_date) = filter.end_date {
            qb.push(" AND created_at <= ").push_bind(end_date);
        }
        if let Some(min_amount) = filter.min_amount {
            qb.push(" AND amount >= ").push_bind(min_amount);
        }
        if let Some(max_amount) = filter.max_amount {
            qb.push(" AND amount <= ").push_bind(max_amount);
        }
        if let Some(currency) = &filter.currency {
            qb.push(" AND currency = ").push_bind(currency.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(payment_type) = filter.payment_type {
            qb.push(" AND type = ").push_bind(payment_type.as_str());
        }
        if let Some(beneficiary_id) = filter.beneficiary_id {
            qb.push(" AND beneficiary_id = ").push_bind(beneficiary_id);
        }
        qb.push(format!(
            " ORDER BY {} {}, payment_id ASC",
            sort_by.column(),
            order.sql()
        ));
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        let payments = rows
            .iter()
            .map(payment_from_row)
            .collect::<sqlx::Result<Vec<_>>>()?;
        Ok(payments)
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<u64> {
        let done = sqlx::query(
            "UPDATE payments SET status = $1 WHERE payment_id = $2 AND status = $3",
        )
        .bind(to.as_str())
        .bind(payment_id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected())
    }

    async fn commit_payment(&self, source_account_id: Uuid, payment: &Payment) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Conditional debit: misses when the account is gone or when a
        // concurrent commit already claimed the funds. Either way nothing
        // below runs against a stale balance.
        let debit = sqlx::query(
            "UPDATE accounts SET balance = balance - $1 \
             WHERE account_id = $2 AND balance >= $1",
        )
        .bind(payment.amount)
        .bind(source_account_id)
        .execute(&mut *tx)
        .await?;

        if debit.rows_affected() != 1 {
            let balance: Option<Decimal> =
                sqlx::query("SELECT balance FROM accounts WHERE account_id = $1")
                    .bind(source_account_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .map(|row| row.try_get("balance"))
                    .transpose()?;

            // dropping the transaction rolls it back
            return match balance {
                Some(available) => Err(BankingError::InsufficientFunds {
                    available,
                    required: payment.amount,
                }),
                None => Err(BankingError::TransactionIntegrity {
                    affected: debit.rows_affected(),
                }),
            };
        }

        let inserted = insert_payment_query(payment).execute(&mut *tx).await?;
        if inserted.rows_affected() != 1 {
            return Err(BankingError::TransactionIntegrity {
                affected: inserted.rows_affected(),
            });
        }

        tx.commit().await?;
        Ok(())
    }
}

fn insert_payment_query(
    payment: &Payment,
) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        "INSERT INTO payments (payment_id, amount, currency, beneficiary_id, source_account_id, \
                               status, type, scheduled_date, created_at, completed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(payment.payment_id)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(payment.beneficiary_id)
    .bind(payment.source_account_id)
    .bind(payment.status.as_str())
    .bind(payment.payment_type.as_str())
    .bind(payment.scheduled_date)
    .bind(payment.created_at)
    .bind(payment.completed_at)
}
