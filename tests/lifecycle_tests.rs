use cuotas::domain::money::Total;
use cuotas::domain::payment::PaymentStatus;
use cuotas::domain::ports::Template;
use cuotas::domain::registration::RegistrationStatus;
use cuotas::error::EngineError;
use std::sync::Arc;

mod common;
use common::{
    RecordingNotifier, email_of, engine, engine_with, installment_payment, new_registration, pay,
    register,
};

#[tokio::test]
async fn test_register_validates_event() {
    let engine = engine();

    assert!(matches!(
        engine.register(new_registration(1, 99)).await,
        Err(EngineError::NotFound { .. })
    ));
    assert!(matches!(
        engine.register(new_registration(1, 3)).await,
        Err(EngineError::ValidationError(_))
    ));

    let registration = register(&engine, 1).await;
    assert_eq!(registration.status, RegistrationStatus::Pending);
    assert!(matches!(
        engine.register(new_registration(1, 1)).await,
        Err(EngineError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_cancel_voids_pending_payments_and_keeps_completed() {
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = engine_with(notifier.clone());
    register(&engine, 1).await;
    let completed = pay(&engine, 1, 1).await;
    let pending = engine.create_payment(installment_payment(1, 2)).await.unwrap();

    let cancelled = engine
        .cancel(1, Some("changed plans".to_string()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, RegistrationStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("changed plans"));

    let payments = engine.payments_for(1).await.unwrap();
    assert_eq!(payments.len(), 2, "voided payments stay in the ledger");
    let completed_after = payments.iter().find(|p| p.id == completed.id).unwrap();
    assert!(completed_after.voided_at.is_none());
    let pending_after = payments.iter().find(|p| p.id == pending.id).unwrap();
    assert!(pending_after.voided_at.is_some());
    assert_eq!(pending_after.status, PaymentStatus::PendingReview);

    let report = engine.income_report(None).await.unwrap();
    assert_eq!(report.outstanding, Total::ZERO);
    assert_eq!(report.collected, Total(5000));

    assert_eq!(
        notifier.sent_with(Template::RegistrationCancelled),
        vec![email_of(1)]
    );
}

#[tokio::test]
async fn test_cancel_then_rehabilitate_round_trip() {
    let engine = engine();
    register(&engine, 1).await;
    pay(&engine, 1, 1).await;
    pay(&engine, 1, 2).await;
    engine.create_payment(installment_payment(1, 3)).await.unwrap();

    let completed_before: Vec<_> = engine
        .payments_for(1)
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.is_completed())
        .collect();

    engine.cancel(1, None).await.unwrap();
    let registration = engine.rehabilitate(1).await.unwrap();
    assert_eq!(registration.status, RegistrationStatus::Pending);
    assert!(registration.cancellation_reason.is_none());

    let completed_after: Vec<_> = engine
        .payments_for(1)
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.is_completed())
        .collect();
    assert_eq!(completed_before.len(), 2);
    assert_eq!(
        completed_before.iter().map(|p| p.id).collect::<Vec<_>>(),
        completed_after.iter().map(|p| p.id).collect::<Vec<_>>()
    );
    assert!(
        completed_before
            .iter()
            .zip(&completed_after)
            .all(|(before, after)| before.status == after.status && before.amount == after.amount)
    );

    // The voided review payment does not come back: installment 3 is plain unpaid again.
    let schedule = engine.installments(1).await.unwrap();
    assert_eq!(schedule.paid_count, 2);
    assert!(schedule.installments[2].payment.is_none());
}

#[tokio::test]
async fn test_rehabilitate_requires_cancelled() {
    let engine = engine();
    register(&engine, 1).await;

    assert!(matches!(
        engine.rehabilitate(1).await,
        Err(EngineError::InvalidTransition(_))
    ));
    assert!(matches!(
        engine.rehabilitate(2).await,
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_cancel_twice_is_rejected() {
    let engine = engine();
    register(&engine, 1).await;
    engine.cancel(1, Some("first".to_string())).await.unwrap();

    assert!(matches!(
        engine.cancel(1, Some("second".to_string())).await,
        Err(EngineError::InvalidTransition(_))
    ));
    let registration = engine.registration(1).await.unwrap();
    assert_eq!(registration.cancellation_reason.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_failed_cancellation_notice_keeps_cancellation() {
    let notifier = Arc::new(RecordingNotifier::failing_for(&[&email_of(1)]));
    let engine = engine_with(notifier.clone());
    register(&engine, 1).await;

    let cancelled = engine.cancel(1, None).await.unwrap();
    assert_eq!(cancelled.status, RegistrationStatus::Cancelled);
    assert!(notifier.sent().is_empty());
    assert!(engine.registration(1).await.unwrap().is_cancelled());
}

#[tokio::test]
async fn test_manual_confirm_requires_full_payment() {
    let engine = engine();
    register(&engine, 1).await;
    pay(&engine, 1, 1).await;

    assert!(matches!(
        engine.confirm(1).await,
        Err(EngineError::InvalidTransition(_))
    ));

    pay(&engine, 1, 2).await;
    pay(&engine, 1, 3).await;
    engine.cancel(1, None).await.unwrap();
    engine.rehabilitate(1).await.unwrap();
    assert_eq!(
        engine.registration(1).await.unwrap().status,
        RegistrationStatus::Pending
    );

    let confirmed = engine.confirm(1).await.unwrap();
    assert_eq!(confirmed.status, RegistrationStatus::Confirmed);
}

#[tokio::test]
async fn test_confirmed_registration_can_be_cancelled() {
    let engine = engine();
    register(&engine, 1).await;
    for number in 1..=3 {
        pay(&engine, 1, number).await;
    }
    assert_eq!(
        engine.registration(1).await.unwrap().status,
        RegistrationStatus::Confirmed
    );

    let cancelled = engine.cancel(1, None).await.unwrap();
    assert_eq!(cancelled.status, RegistrationStatus::Cancelled);
    assert_eq!(engine.installments(1).await.unwrap().paid_count, 3);
}
