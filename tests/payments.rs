use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use uuid::Uuid;

use openbanking_service::db::{
    Ledger, PaymentFilter, PaymentSortBy, PaymentStatus, PaymentType, SortOrder,
};
use openbanking_service::payments::PaymentRequest;
use openbanking_service::BankingError;

mod common;

use common::{seed_account, seed_beneficiary, test_state};

fn request(
    amount: rust_decimal::Decimal,
    currency: &str,
    beneficiary_id: Uuid,
    source_account_id: Uuid,
) -> PaymentRequest {
    PaymentRequest {
        amount,
        currency: currency.to_string(),
        beneficiary_id,
        source_account_id,
    }
}

async fn payment_count(state: &openbanking_service::routes::AppState) -> usize {
    state
        .ledger
        .list_payments(
            &PaymentFilter::default(),
            PaymentSortBy::CreatedAt,
            SortOrder::Asc,
            None,
        )
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn initiate_debits_source_and_records_completed_payment() {
    let state = test_state();
    let account_id = seed_account(&state, dec!(100.00), "USD").await;
    let beneficiary_id = seed_beneficiary(&state, "Jane Roe").await;

    let payment = state
        .payments
        .initiate(
            request(dec!(60.00), "USD", beneficiary_id, account_id),
            PaymentType::Immediate,
        )
        .await
        .unwrap();

    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.payment_type, PaymentType::Immediate);
    assert!(payment.completed_at.is_some());

    let account = state.ledger.get_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, dec!(40.00));

    // a second 60.00 no longer fits into the remaining 40.00
    let err = state
        .payments
        .initiate(
            request(dec!(60.00), "USD", beneficiary_id, account_id),
            PaymentType::Immediate,
        )
        .await
        .unwrap_err();
    match err {
        BankingError::InsufficientFunds { available, required } => {
            assert_eq!(available, dec!(40.00));
            assert_eq!(required, dec!(60.00));
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    let account = state.ledger.get_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, dec!(40.00));
    assert_eq!(payment_count(&state).await, 1);
}

#[tokio::test]
async fn missing_beneficiary_fails_before_any_write() {
    let state = test_state();
    let account_id = seed_account(&state, dec!(100.00), "USD").await;

    let err = state
        .payments
        .initiate(
            request(dec!(10.00), "USD", Uuid::new_v4(), account_id),
            PaymentType::Immediate,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BankingError::BeneficiaryNotFound(_)));

    let account = state.ledger.get_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, dec!(100.00));
    assert_eq!(payment_count(&state).await, 0);
}

#[tokio::test]
async fn missing_source_account_fails_before_any_write() {
    let state = test_state();
    let beneficiary_id = seed_beneficiary(&state, "Jane Roe").await;

    let err = state
        .payments
        .initiate(
            request(dec!(10.00), "USD", beneficiary_id, Uuid::new_v4()),
            PaymentType::Immediate,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BankingError::AccountNotFound(_)));
    assert_eq!(payment_count(&state).await, 0);
}

#[tokio::test]
async fn blocked_currency_is_rejected_before_account_lookup() {
    let state = test_state();
    let account_id = seed_account(&state, dec!(100.00), "RUB").await;
    let beneficiary_id = seed_beneficiary(&state, "Jane Roe").await;

    let err = state
        .payments
        .initiate(
            request(dec!(10.00), "RUB", beneficiary_id, account_id),
            PaymentType::Immediate,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BankingError::PaymentBlocked(code) if code == "RUB"));

    let account = state.ledger.get_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, dec!(100.00));
    assert_eq!(payment_count(&state).await, 0);
}

#[tokio::test]
async fn concurrent_initiations_cannot_overdraw_the_account() {
    let state = test_state();
    let account_id = seed_account(&state, dec!(100.00), "USD").await;
    let beneficiary_id = seed_beneficiary(&state, "Jane Roe").await;

    let first = tokio::spawn({
        let state = state.clone();
        async move {
            state
                .payments
                .initiate(
                    request(dec!(60.00), "USD", beneficiary_id, account_id),
                    PaymentType::Immediate,
                )
                .await
        }
    });
    let second = tokio::spawn({
        let state = state.clone();
        async move {
            state
                .payments
                .initiate(
                    request(dec!(60.00), "USD", beneficiary_id, account_id),
                    PaymentType::Immediate,
                )
                .await
        }
    });

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let successes = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(successes, 1, "exactly one of the two payments may commit");
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, Err(BankingError::InsufficientFunds { .. }))));

    let account = state.ledger.get_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, dec!(40.00));
    assert_eq!(payment_count(&state).await, 1);
}

#[tokio::test]
async fn scheduled_payment_moves_no_funds_until_cancelled_and_after() {
    let state = test_state();
    let account_id = seed_account(&state, dec!(100.00), "USD").await;
    let beneficiary_id = seed_beneficiary(&state, "Jane Roe").await;

    let payment = state
        .payments
        .schedule(
            request(dec!(50.00), "USD", beneficiary_id, account_id),
            Utc::now() + Duration::days(7),
        )
        .await
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Scheduled);
    assert_eq!(payment.payment_type, PaymentType::Scheduled);
    assert!(payment.scheduled_date.is_some());
    assert!(payment.completed_at.is_none());

    let account = state.ledger.get_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, dec!(100.00));

    let cancelled = state.payments.cancel(payment.payment_id).await.unwrap();
    assert_eq!(cancelled.status, PaymentStatus::Cancelled);

    let stored = state
        .ledger
        .get_payment(payment.payment_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PaymentStatus::Cancelled);

    let account = state.ledger.get_account(account_id).await.unwrap().unwrap();
    assert_eq!(account.balance, dec!(100.00));

    // cancelling twice fails on the second attempt
    let err = state.payments.cancel(payment.payment_id).await.unwrap_err();
    assert!(matches!(
        err,
        BankingError::InvalidStateTransition(PaymentStatus::Cancelled)
    ));
}

#[tokio::test]
async fn completed_payments_cannot_be_cancelled() {
    let state = test_state();
    let account_id = seed_account(&state, dec!(100.00), "USD").await;
    let beneficiary_id = seed_beneficiary(&state, "Jane Roe").await;

    let payment = state
        .payments
        .initiate(
            request(dec!(10.00), "USD", beneficiary_id, account_id),
            PaymentType::Immediate,
        )
        .await
        .unwrap();

    let err = state.payments.cancel(payment.payment_id).await.unwrap_err();
    assert!(matches!(
        err,
        BankingError::InvalidStateTransition(PaymentStatus::Completed)
    ));
}

#[tokio::test]
async fn cancelling_unknown_payment_reports_not_found() {
    let state = test_state();
    let err = state.payments.cancel(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, BankingError::PaymentNotFound(_)));
}

#[tokio::test]
async fn scheduling_in_the_past_is_rejected() {
    let state = test_state();
    let account_id = seed_account(&state, dec!(100.00), "USD").await;
    let beneficiary_id = seed_beneficiary(&state, "Jane Roe").await;

    let err = state
        .payments
        .schedule(
            request(dec!(50.00), "USD", beneficiary_id, account_id),
            Utc::now() - Duration::hours(1),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BankingError::Validation {
            field: "scheduled_date",
            ..
        }
    ));
    assert_eq!(payment_count(&state).await, 0);
}

#[tokio::test]
async fn invalid_amount_and_currency_fail_validation() {
    let state = test_state();
    let account_id = seed_account(&state, dec!(100.00), "USD").await;
    let beneficiary_id = seed_beneficiary(&state, "Jane Roe").await;

    let err = state
        .payments
        .initiate(
            request(dec!(0.00), "USD", beneficiary_id, account_id),
            PaymentType::Immediate,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BankingError::Validation { field: "amount", .. }));

    let err = state
        .payments
        .initiate(
            request(dec!(5.00), "usd", beneficiary_id, account_id),
            PaymentType::Immediate,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BankingError::Validation {
            field: "currency",
            ..
        }
    ));
    assert_eq!(payment_count(&state).await, 0);
}
