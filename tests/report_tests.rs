use cuotas::domain::money::{Amount, Total};
use cuotas::domain::payment::NewPayment;
use cuotas::domain::report::InstallmentTotals;
use cuotas::error::EngineError;

mod common;
use common::{engine, installment_payment, pay, register, register_for};

#[tokio::test]
async fn test_report_with_no_registrations_is_zeroed() {
    let engine = engine();
    let report = engine.income_report(None).await.unwrap();

    assert_eq!(report.collected, Total::ZERO);
    assert_eq!(report.outstanding, Total::ZERO);
    assert_eq!(report.total_registrations, 0);
    assert!(report.by_installment.is_empty());
}

#[tokio::test]
async fn test_two_of_three_installments_paid() {
    let engine = engine();
    register(&engine, 1).await;
    pay(&engine, 1, 1).await;
    pay(&engine, 1, 2).await;

    let report = engine.income_report(None).await.unwrap();

    assert_eq!(report.collected, Total(10000));
    assert_eq!(report.outstanding, Total(5000));
    assert_eq!(report.collected.to_string(), "100.00");
    assert_eq!(report.outstanding.to_string(), "50.00");
    assert_eq!(
        report.by_installment[&3],
        InstallmentTotals {
            collected: Total::ZERO,
            outstanding: Total(5000)
        }
    );
    assert_eq!(report.pending_count, 1);
}

#[tokio::test]
async fn test_review_payments_are_still_outstanding() {
    let engine = engine();
    register(&engine, 1).await;
    engine.create_payment(installment_payment(1, 1)).await.unwrap();

    let report = engine.income_report(None).await.unwrap();
    assert_eq!(report.collected, Total::ZERO);
    assert_eq!(report.outstanding, Total(15000));
}

#[tokio::test]
async fn test_status_counts_and_cancelled_registrations() {
    let engine = engine();
    register(&engine, 1).await;
    for number in 1..=3 {
        pay(&engine, 1, number).await;
    }
    register(&engine, 2).await;
    register(&engine, 3).await;
    pay(&engine, 3, 1).await;
    engine.cancel(3, None).await.unwrap();

    let report = engine.income_report(None).await.unwrap();

    assert_eq!(report.total_registrations, 3);
    assert_eq!(report.confirmed_count, 1);
    assert_eq!(report.pending_count, 1);
    assert_eq!(report.cancelled_count, 1);
    // Money already taken from the cancelled registration still counts as collected.
    assert_eq!(report.collected, Total(20000));
    assert_eq!(report.outstanding, Total(15000));
}

#[tokio::test]
async fn test_report_filtered_by_event() {
    let engine = engine();
    register(&engine, 1).await;
    register_for(&engine, 2, 2).await;
    engine
        .create_payment(NewPayment::new(2, 1, Amount::new(4500).unwrap()).approved())
        .await
        .unwrap();

    let report = engine.income_report(Some(2)).await.unwrap();
    assert_eq!(report.total_registrations, 1);
    assert_eq!(report.collected, Total(4500));
    assert_eq!(report.outstanding, Total(4500));
    assert_eq!(report.by_installment.len(), 2);

    let all = engine.income_report(None).await.unwrap();
    assert_eq!(all.total_registrations, 2);
    assert_eq!(all.outstanding, Total(19500));

    assert!(matches!(
        engine.income_report(Some(42)).await,
        Err(EngineError::NotFound { .. })
    ));
}
