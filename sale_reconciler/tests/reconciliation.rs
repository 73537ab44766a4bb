use sale_reconciler::{
    db_types::{LedgerEntryKind, Money, NewOrder, OrderId, OrderStatusType, PaymentEvent, PaymentId, PaymentUpdate},
    events::EventProducers,
    test_utils::seed::{seed_order, seed_product},
    NoOpReason,
    ReconcileError,
    ReconcilerDatabase,
    TransitionOutcome,
};

mod support;
use support::*;

fn o1() -> OrderId {
    OrderId::from("o1")
}

#[tokio::test]
async fn approve_redeliver_refund() {
    let api = setup(EventProducers::default()).await;
    seed_consignment_order(api.db()).await;

    let approved = PaymentEvent::Approved(payment("pay123", "approved"));
    let outcome = api.reconcile(approved.clone()).await.expect("Error reconciling approval");
    let TransitionOutcome::Finalized(order) = outcome else {
        panic!("Expected the order to be finalized, got {outcome:?}");
    };
    assert_eq!(order.id, o1());
    assert_eq!(order.status, OrderStatusType::Finalized);
    assert_eq!(order.external_payment_id, Some(PaymentId::from("pay123")));
    assert_eq!(order.external_payment_status.as_deref(), Some("approved"));
    assert!(order.paid_at.is_some());

    let p1 = product(api.db(), "p1").await;
    assert_eq!(p1.stock_quantity, 4);
    assert!(p1.sold);
    let credits = api.db().fetch_credits_for_order(&o1()).await.unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].supplier_id.0, "s1");
    assert_eq!(credits[0].amount, Money::from(6_000));
    assert_eq!(credits[0].kind, LedgerEntryKind::Credit);
    assert_eq!(credits[0].description, "Consignment sale of 1x Ceramic vase (order o1)");

    // Redelivery changes nothing
    let outcome = api.reconcile(approved.clone()).await.expect("Error reconciling redelivery");
    assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::AlreadyApplied { .. })), "{outcome:?}");
    assert_eq!(product(api.db(), "p1").await.stock_quantity, 4);
    assert_eq!(api.db().fetch_credits_for_order(&o1()).await.unwrap().len(), 1);

    let refunded = PaymentEvent::Refunded(payment("pay123", "refunded"));
    let outcome = api.reconcile(refunded.clone()).await.expect("Error reconciling refund");
    let TransitionOutcome::Refunded(order) = outcome else {
        panic!("Expected the order to be refunded, got {outcome:?}");
    };
    assert_eq!(order.status, OrderStatusType::Refunded);
    assert_eq!(order.external_payment_status.as_deref(), Some("refunded"));
    let p1 = product(api.db(), "p1").await;
    assert_eq!(p1.stock_quantity, 5);
    assert!(!p1.sold);
    // The supplier keeps the credit
    assert_eq!(api.db().fetch_credits_for_supplier(&"s1".into()).await.unwrap().len(), 1);

    let outcome = api.reconcile(refunded).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::AlreadyApplied { .. })), "{outcome:?}");
    assert_eq!(product(api.db(), "p1").await.stock_quantity, 5);

    // A late approval never revives a refunded order
    let outcome = api.reconcile(approved).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::Stale { .. })), "{outcome:?}");
    let order = api.db().fetch_order(&o1()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Refunded);
    assert_eq!(product(api.db(), "p1").await.stock_quantity, 5);
    tear_down(api).await;
}

#[tokio::test]
async fn pending_then_approved() {
    let api = setup(EventProducers::default()).await;
    seed_consignment_order(api.db()).await;

    let pending = PaymentEvent::Pending(payment("pay123", "in_process"));
    let outcome = api.reconcile(pending.clone()).await.unwrap();
    let TransitionOutcome::StatusMirrored(order) = outcome else {
        panic!("Expected the payment to be linked, got {outcome:?}");
    };
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert_eq!(order.external_payment_id, Some(PaymentId::from("pay123")));
    assert_eq!(order.external_payment_status.as_deref(), Some("in_process"));
    assert_eq!(product(api.db(), "p1").await.stock_quantity, 5);

    let outcome = api.reconcile(pending).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::StatusUnchanged { .. })), "{outcome:?}");

    let outcome = api.reconcile(PaymentEvent::Pending(payment("pay123", "pending"))).await.unwrap();
    let TransitionOutcome::StatusMirrored(order) = outcome else {
        panic!("Expected the status to be mirrored, got {outcome:?}");
    };
    assert_eq!(order.external_payment_status.as_deref(), Some("pending"));

    // The approval finds the order through the link and applies the sale exactly once
    let approved = PaymentEvent::Approved(PaymentUpdate::new("pay123", "approved"));
    let outcome = api.reconcile(approved.clone()).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::Finalized(_)), "{outcome:?}");
    assert_eq!(product(api.db(), "p1").await.stock_quantity, 4);
    assert_eq!(api.db().fetch_credits_for_order(&o1()).await.unwrap().len(), 1);

    let outcome = api.reconcile(approved).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::NoOp(_)), "{outcome:?}");
    assert_eq!(product(api.db(), "p1").await.stock_quantity, 4);
    assert_eq!(api.db().fetch_credits_for_order(&o1()).await.unwrap().len(), 1);

    // Pending notifications do not touch a finalized order
    let outcome = api.reconcile(PaymentEvent::Pending(payment("pay123", "in_process"))).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::Stale { .. })), "{outcome:?}");
    let order = api.db().fetch_order(&o1()).await.unwrap().unwrap();
    assert_eq!(order.external_payment_status.as_deref(), Some("approved"));
    tear_down(api).await;
}

#[tokio::test]
async fn rejection_cancels_by_reference_and_sticks() {
    let api = setup(EventProducers::default()).await;
    seed_consignment_order(api.db()).await;

    let outcome = api.reconcile(PaymentEvent::Rejected(payment("pay123", "rejected"))).await.unwrap();
    let TransitionOutcome::Cancelled(order) = outcome else {
        panic!("Expected the order to be cancelled, got {outcome:?}");
    };
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.external_payment_id, Some(PaymentId::from("pay123")));

    let outcome = api.reconcile(PaymentEvent::Rejected(payment("pay123", "rejected"))).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::AlreadyApplied { .. })), "{outcome:?}");

    // Neither the same payment nor a new attempt can move a cancelled order
    for id in ["pay123", "pay456"] {
        let outcome = api.reconcile(PaymentEvent::Approved(payment(id, "approved"))).await.unwrap();
        assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::Stale { .. })), "{outcome:?}");
        let outcome = api.reconcile(PaymentEvent::Pending(payment(id, "in_process"))).await.unwrap();
        assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::Stale { .. })), "{outcome:?}");
    }
    let order = api.db().fetch_order(&o1()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.external_payment_id, Some(PaymentId::from("pay123")));
    assert_eq!(product(api.db(), "p1").await.stock_quantity, 5);
    assert!(api.db().fetch_credits_for_order(&o1()).await.unwrap().is_empty());
    tear_down(api).await;
}

#[tokio::test]
async fn rejection_of_finalized_order_is_ignored() {
    let api = setup(EventProducers::default()).await;
    seed_consignment_order(api.db()).await;
    api.reconcile(PaymentEvent::Approved(payment("pay123", "approved"))).await.unwrap();
    let outcome = api.reconcile(PaymentEvent::Rejected(payment("pay123", "cancelled"))).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::Stale { .. })), "{outcome:?}");
    let order = api.db().fetch_order(&o1()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Finalized);
    tear_down(api).await;
}

#[tokio::test]
async fn refund_before_approval_is_dropped() {
    let api = setup(EventProducers::default()).await;
    seed_consignment_order(api.db()).await;

    let outcome = api.reconcile(PaymentEvent::Refunded(payment("pay123", "refunded"))).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::Dangling(_)), "{outcome:?}");
    let order = api.db().fetch_order(&o1()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert!(order.external_payment_id.is_none());
    assert_eq!(product(api.db(), "p1").await.stock_quantity, 5);

    // The approval that follows is applied normally
    let outcome = api.reconcile(PaymentEvent::Approved(payment("pay123", "approved"))).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::Finalized(_)), "{outcome:?}");
    tear_down(api).await;
}

#[tokio::test]
async fn unresolvable_approvals_fail_without_changes() {
    let api = setup(EventProducers::default()).await;
    seed_consignment_order(api.db()).await;

    let err = api.reconcile(PaymentEvent::Approved(PaymentUpdate::new("pay123", "approved"))).await.unwrap_err();
    assert_eq!(err, ReconcileError::MissingReference("pay123".into()));

    let update = PaymentUpdate::new("pay123", "approved").with_reference("o404");
    let err = api.reconcile(PaymentEvent::Approved(update)).await.unwrap_err();
    assert_eq!(err, ReconcileError::OrderNotFound("o404".into()));

    let order = api.db().fetch_order(&o1()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert!(api.db().fetch_order_by_payment_id(&"pay123".into()).await.unwrap().is_none());
    tear_down(api).await;
}

#[tokio::test]
async fn unhandled_statuses_are_acknowledged() {
    let api = setup(EventProducers::default()).await;
    seed_consignment_order(api.db()).await;
    let event = PaymentEvent::Unhandled { payment_id: "pay123".into(), status: "in_mediation".into() };
    let outcome = api.reconcile(event).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::NoOp(NoOpReason::Unhandled { .. })), "{outcome:?}");
    let order = api.db().fetch_order(&o1()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert!(order.external_payment_status.is_none());
    tear_down(api).await;
}

#[tokio::test]
async fn refund_restores_every_line() {
    let api = setup(EventProducers::default()).await;
    seed_consignment_order(api.db()).await;
    seed_product(api.db(), "p2", "Linen napkins", 2_500, 10, None).await;
    seed_product(api.db(), "p3", "Teapot", 8_000, 2, Some("s1")).await;
    let order = NewOrder::new("o2".into(), None)
        .with_line("p1".into(), 2, Money::from(10_000))
        .with_line("p2".into(), 3, Money::from(2_500))
        .with_line("p3".into(), 2, Money::from(8_000))
        .with_shipping(Money::from(1_500), "Rua das Flores, 12");
    seed_order(api.db(), order).await;

    let update = PaymentUpdate::new("pay-o2", "approved").with_reference("o2");
    let outcome = api.reconcile(PaymentEvent::Approved(update)).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::Finalized(_)), "{outcome:?}");
    assert_eq!(product(api.db(), "p1").await.stock_quantity, 3);
    assert_eq!(product(api.db(), "p2").await.stock_quantity, 7);
    assert_eq!(product(api.db(), "p3").await.stock_quantity, 0);

    let credits = api.db().fetch_credits_for_order(&"o2".into()).await.unwrap();
    assert_eq!(credits.len(), 2, "only the consignment lines credit the supplier");
    let total: Money = credits.iter().map(|c| c.amount).sum();
    assert_eq!(total, Money::from(12_000 + 9_600));

    let update = PaymentUpdate::new("pay-o2", "charged_back");
    let outcome = api.reconcile(PaymentEvent::Refunded(update)).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::Refunded(_)), "{outcome:?}");
    for (id, stock) in [("p1", 5), ("p2", 10), ("p3", 2)] {
        let p = product(api.db(), id).await;
        assert_eq!(p.stock_quantity, stock, "stock for {id}");
        assert!(!p.sold, "sold flag for {id}");
    }
    tear_down(api).await;
}

#[tokio::test]
async fn stock_never_goes_negative() {
    let api = setup(EventProducers::default()).await;
    seed_product(api.db(), "p9", "Last print", 4_000, 1, None).await;
    let order = NewOrder::new("o9".into(), None).with_line("p9".into(), 3, Money::from(4_000));
    seed_order(api.db(), order).await;
    let update = PaymentUpdate::new("pay-o9", "approved").with_reference("o9").with_payer_email("buyer@example.com");
    let outcome = api.reconcile(PaymentEvent::Approved(update)).await.unwrap();
    assert!(matches!(outcome, TransitionOutcome::Finalized(_)), "{outcome:?}");
    let p9 = product(api.db(), "p9").await;
    assert_eq!(p9.stock_quantity, 0);
    assert!(p9.sold);
    assert!(api.db().fetch_credits_for_order(&"o9".into()).await.unwrap().is_empty());
    tear_down(api).await;
}

#[tokio::test]
async fn failed_side_effects_roll_back_the_whole_transition() {
    let api = setup(EventProducers::default()).await;
    seed_consignment_order(api.db()).await;
    let lines = api.db().fetch_order_lines(&o1()).await.unwrap();
    // A stray ledger entry for the line item makes the credit insert fail on the unique index. By then the status
    // has been switched and the stock decremented inside the same transaction.
    sqlx::query(
        "INSERT INTO supplier_credits (supplier_id, order_id, order_item_id, amount, kind, description) VALUES ('s1', \
         'o1', $1, 6000, 'CREDIT', 'stray entry')",
    )
    .bind(lines[0].item_id)
    .execute(api.db().pool())
    .await
    .expect("Error inserting ledger entry");

    let err = api
        .reconcile(PaymentEvent::Approved(payment("pay123", "approved")))
        .await
        .expect_err("The approval should have failed");
    assert!(matches!(err, ReconcileError::DatabaseError(_)), "{err:?}");

    let order = api.db().fetch_order(&o1()).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PendingPayment);
    assert!(order.external_payment_id.is_none());
    assert!(order.external_payment_status.is_none());
    assert!(order.paid_at.is_none());
    let p1 = product(api.db(), "p1").await;
    assert_eq!(p1.stock_quantity, 5);
    assert!(!p1.sold);
    let credits = api.db().fetch_credits_for_order(&o1()).await.unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].description, "stray entry");
    assert!(api.db().fetch_order_by_payment_id(&PaymentId::from("pay123")).await.unwrap().is_none());
    tear_down(api).await;
}
