use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use rollbook::{
    config::MembershipConfig,
    domain::{
        AttendeePaymentStatus, CreateEventRequest, CreateMemberRequest, MemberStatus,
        MembershipType, PaymentMethod, PaymentStatus, UpdateMemberRequest, Zone,
    },
    error::AppError,
    notify::RecordingNotifier,
    payments::FakeGateway,
    repository::{
        EventRepository, MemberRepository, PaymentRepository, SqliteEventRepository,
        SqliteMemberRepository, SqlitePaymentRepository,
    },
    service::{FixedClock, MembershipLifecycle, RecordEventPaymentRequest, RenewMemberRequest},
};

struct Fixture {
    members: Arc<SqliteMemberRepository>,
    events: Arc<SqliteEventRepository>,
    payments: Arc<SqlitePaymentRepository>,
    gateway: Arc<FakeGateway>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<FixedClock>,
    lifecycle: MembershipLifecycle,
}

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

async fn setup(now: DateTime<Utc>) -> anyhow::Result<Fixture> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let members = Arc::new(SqliteMemberRepository::new(pool.clone()));
    let events = Arc::new(SqliteEventRepository::new(pool.clone()));
    let payments = Arc::new(SqlitePaymentRepository::new(pool));
    let gateway = Arc::new(FakeGateway::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(FixedClock::new(now));

    let lifecycle = MembershipLifecycle::new(
        members.clone(),
        events.clone(),
        payments.clone(),
        gateway.clone(),
        notifier.clone(),
        clock.clone(),
        MembershipConfig {
            annual_fee_minor: 10_000,
            currency: "INR".to_string(),
        },
    );

    Ok(Fixture {
        members,
        events,
        payments,
        gateway,
        notifier,
        clock,
        lifecycle,
    })
}

async fn make_member(
    fx: &Fixture,
    email: &str,
    expiry: Option<DateTime<Utc>>,
    auto_renew: bool,
    method: Option<PaymentMethod>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    fx.members
        .create(
            id,
            CreateMemberRequest {
                first_name: "Member".to_string(),
                last_name: email.split('@').next().unwrap_or("x").to_string(),
                email: email.to_string(),
                phone: None,
                zone: Zone::Central,
                membership_type: MembershipType::Regular,
                auto_renew,
                default_payment_method: method,
            },
            "<svg/>".to_string(),
        )
        .await?;
    fx.members
        .update(
            id,
            UpdateMemberRequest {
                status: Some(MemberStatus::Active),
                expiry_date: expiry,
                ..Default::default()
            },
        )
        .await?;
    Ok(id)
}

#[tokio::test]
async fn renewing_a_lapsed_membership_extends_from_today() -> anyhow::Result<()> {
    let fx = setup(date(2024, 6, 1)).await?;
    let id = make_member(&fx, "lapsed@example.com", Some(date(2024, 1, 1)), false, None).await?;

    let renewed = fx
        .lifecycle
        .renew(
            id,
            RenewMemberRequest {
                months: 12,
                payment_method: Some(PaymentMethod::Cash),
                transaction_id: None,
                amount_minor: None,
                notes: Some("Renewed at front desk".to_string()),
            },
            None,
        )
        .await?;

    // Lapsed in January, renewed June 1st: the new year runs from today.
    assert_eq!(renewed.expiry_date, Some(date(2025, 6, 1)));
    assert_eq!(renewed.status, MemberStatus::Active);

    let history = fx.members.renewal_history(id).await?;
    assert_eq!(history.len(), 1);

    let receipts = fx.members.receipts(id).await?;
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].amount_minor, 10_000);

    assert_eq!(fx.notifier.sent_count(), 1);
    assert_eq!(fx.notifier.subjects(), vec!["Membership renewed"]);

    Ok(())
}

#[tokio::test]
async fn renewing_early_extends_from_the_current_expiry() -> anyhow::Result<()> {
    let fx = setup(date(2024, 6, 1)).await?;
    let id = make_member(&fx, "early@example.com", Some(date(2025, 1, 1)), false, None).await?;

    let renewed = fx
        .lifecycle
        .renew(
            id,
            RenewMemberRequest {
                months: 12,
                payment_method: None,
                transaction_id: None,
                amount_minor: None,
                notes: None,
            },
            None,
        )
        .await?;

    assert_eq!(renewed.expiry_date, Some(date(2026, 1, 1)));

    // No payment method given, so no receipt was written.
    assert!(fx.members.receipts(id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn zero_month_renewal_is_rejected() -> anyhow::Result<()> {
    let fx = setup(date(2024, 6, 1)).await?;
    let id = make_member(&fx, "zero@example.com", None, false, None).await?;

    let err = fx
        .lifecycle
        .renew(
            id,
            RenewMemberRequest {
                months: 0,
                payment_method: None,
                transaction_id: None,
                amount_minor: None,
                notes: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn auto_renewal_failures_do_not_stop_the_run() -> anyhow::Result<()> {
    let now = date(2024, 6, 1);
    let fx = setup(now).await?;

    // Both expire inside the one-week lookahead. The first charges through
    // the gateway, the second renews against a cash default.
    let card_member = make_member(
        &fx,
        "card@example.com",
        Some(now + Duration::days(3)),
        true,
        Some(PaymentMethod::Razorpay),
    )
    .await?;
    let cash_member = make_member(
        &fx,
        "cash@example.com",
        Some(now + Duration::days(3)),
        true,
        Some(PaymentMethod::Cash),
    )
    .await?;
    // Outside the window; must not be touched.
    let later_member = make_member(
        &fx,
        "later@example.com",
        Some(now + Duration::days(20)),
        true,
        None,
    )
    .await?;

    fx.gateway.set_failing(true);
    let report = fx.lifecycle.run_auto_renewals().await?;

    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].member_id, card_member);

    // Expiry moved forward a year from the old date, 2024-06-04.
    let cash = fx.members.find_by_id(cash_member).await?.unwrap();
    assert_eq!(cash.expiry_date, Some(date(2025, 6, 4)));

    let card = fx.members.find_by_id(card_member).await?.unwrap();
    assert_eq!(card.expiry_date, Some(now + Duration::days(3)));

    let later = fx.members.find_by_id(later_member).await?.unwrap();
    assert_eq!(later.expiry_date, Some(now + Duration::days(20)));

    // One confirmation for the cash renewal, one failure notice.
    let subjects = fx.notifier.subjects();
    assert!(subjects.contains(&"Membership renewed".to_string()));
    assert!(subjects.contains(&"Membership renewal failed".to_string()));

    // Once the gateway recovers, the declined member renews too.
    fx.gateway.set_failing(false);
    let report = fx.lifecycle.run_auto_renewals().await?;
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failures.len(), 0);
    assert_eq!(fx.gateway.order_count(), 1);

    Ok(())
}

#[tokio::test]
async fn expiry_sweep_deactivates_overdue_members() -> anyhow::Result<()> {
    let now = date(2024, 6, 1);
    let fx = setup(now).await?;

    let overdue = make_member(
        &fx,
        "overdue@example.com",
        Some(now - Duration::days(1)),
        false,
        None,
    )
    .await?;
    let current = make_member(
        &fx,
        "current@example.com",
        Some(now + Duration::days(100)),
        false,
        None,
    )
    .await?;

    let report = fx.lifecycle.expire_overdue().await?;
    assert_eq!(report.succeeded, 1);

    let expired = fx.members.find_by_id(overdue).await?.unwrap();
    assert_eq!(expired.status, MemberStatus::Inactive);

    let untouched = fx.members.find_by_id(current).await?.unwrap();
    assert_eq!(untouched.status, MemberStatus::Active);

    assert_eq!(fx.notifier.subjects(), vec!["Membership expired"]);

    Ok(())
}

#[tokio::test]
async fn reminders_go_to_the_thirty_day_window_only() -> anyhow::Result<()> {
    let now = date(2024, 6, 1);
    let fx = setup(now).await?;

    make_member(
        &fx,
        "soon@example.com",
        Some(now + Duration::days(29) + Duration::hours(12)),
        false,
        None,
    )
    .await?;
    make_member(
        &fx,
        "later@example.com",
        Some(now + Duration::days(45)),
        false,
        None,
    )
    .await?;
    make_member(
        &fx,
        "imminent@example.com",
        Some(now + Duration::days(5)),
        false,
        None,
    )
    .await?;

    let report = fx.lifecycle.send_renewal_reminders().await?;
    assert_eq!(report.succeeded, 1);

    let sent = fx.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "soon@example.com");
    assert_eq!(sent[0].subject, "Membership expiring soon");

    Ok(())
}

#[tokio::test]
async fn gateway_payment_is_recorded_atomically() -> anyhow::Result<()> {
    let now = date(2024, 6, 1);
    let fx = setup(now).await?;

    let member = make_member(&fx, "payer@example.com", None, false, None).await?;
    let event = fx
        .events
        .create(CreateEventRequest {
            title: "Gala".to_string(),
            description: None,
            start_date: now + Duration::days(10),
            end_date: None,
            location: None,
            max_attendees: None,
            fee_minor: Some(50_000),
            organizer_id: None,
            ticket_types: vec![],
        })
        .await?;
    fx.events.register_attendee(event.id, member).await?;

    let payment = fx
        .lifecycle
        .record_event_payment(
            event.id,
            RecordEventPaymentRequest {
                member_id: member,
                amount_minor: 50_000,
                payment_method: PaymentMethod::Razorpay,
                ticket_type: Some("Standard".to_string()),
                transaction_id: None,
            },
            None,
        )
        .await?;

    assert_eq!(payment.status, PaymentStatus::Paid);
    assert!(payment
        .transaction_id
        .as_deref()
        .unwrap()
        .starts_with("order_fake_"));

    let attendee = fx.events.find_attendee(event.id, member).await?.unwrap();
    assert_eq!(attendee.payment_status, AttendeePaymentStatus::Paid);

    let refreshed = fx.events.find_by_id(event.id).await?.unwrap();
    assert_eq!(refreshed.total_revenue_minor, 50_000);

    let receipts = fx.members.receipts(member).await?;
    assert_eq!(receipts.len(), 1);

    Ok(())
}

#[tokio::test]
async fn cash_payment_stays_pending_until_confirmed() -> anyhow::Result<()> {
    let now = date(2024, 6, 1);
    let fx = setup(now).await?;

    let member = make_member(&fx, "cashpayer@example.com", None, false, None).await?;
    let event = fx
        .events
        .create(CreateEventRequest {
            title: "Dinner".to_string(),
            description: None,
            start_date: now + Duration::days(10),
            end_date: None,
            location: None,
            max_attendees: None,
            fee_minor: Some(20_000),
            organizer_id: None,
            ticket_types: vec![],
        })
        .await?;
    fx.events.register_attendee(event.id, member).await?;

    let payment = fx
        .lifecycle
        .record_event_payment(
            event.id,
            RecordEventPaymentRequest {
                member_id: member,
                amount_minor: 20_000,
                payment_method: PaymentMethod::Cash,
                ticket_type: None,
                transaction_id: None,
            },
            None,
        )
        .await?;
    assert_eq!(payment.status, PaymentStatus::Pending);
    // No gateway involvement for cash.
    assert_eq!(fx.gateway.order_count(), 0);

    let confirmed = fx
        .payments
        .update_status(payment.id, PaymentStatus::Paid)
        .await?;
    assert_eq!(confirmed.status, PaymentStatus::Paid);

    // Paid never goes back to pending.
    let err = fx
        .payments
        .update_status(payment.id, PaymentStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn declined_gateway_leaves_no_partial_records() -> anyhow::Result<()> {
    let now = date(2024, 6, 1);
    let fx = setup(now).await?;

    let member = make_member(&fx, "declined@example.com", None, false, None).await?;
    let event = fx
        .events
        .create(CreateEventRequest {
            title: "Workshop".to_string(),
            description: None,
            start_date: now + Duration::days(10),
            end_date: None,
            location: None,
            max_attendees: None,
            fee_minor: Some(10_000),
            organizer_id: None,
            ticket_types: vec![],
        })
        .await?;
    fx.events.register_attendee(event.id, member).await?;

    fx.gateway.set_failing(true);
    let err = fx
        .lifecycle
        .record_event_payment(
            event.id,
            RecordEventPaymentRequest {
                member_id: member,
                amount_minor: 10_000,
                payment_method: PaymentMethod::Razorpay,
                ticket_type: None,
                transaction_id: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Gateway(_)));

    assert!(fx.payments.list_by_event(event.id).await?.is_empty());
    let attendee = fx.events.find_attendee(event.id, member).await?.unwrap();
    assert_eq!(attendee.payment_status, AttendeePaymentStatus::Unpaid);
    let refreshed = fx.events.find_by_id(event.id).await?.unwrap();
    assert_eq!(refreshed.total_revenue_minor, 0);

    Ok(())
}

#[tokio::test]
async fn unregistered_member_cannot_pay() -> anyhow::Result<()> {
    let now = date(2024, 6, 1);
    let fx = setup(now).await?;

    let member = make_member(&fx, "stranger@example.com", None, false, None).await?;
    let event = fx
        .events
        .create(CreateEventRequest {
            title: "Meetup".to_string(),
            description: None,
            start_date: now + Duration::days(10),
            end_date: None,
            location: None,
            max_attendees: None,
            fee_minor: None,
            organizer_id: None,
            ticket_types: vec![],
        })
        .await?;

    let err = fx
        .lifecycle
        .record_event_payment(
            event.id,
            RecordEventPaymentRequest {
                member_id: member,
                amount_minor: 5_000,
                payment_method: PaymentMethod::Cash,
                ticket_type: None,
                transaction_id: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    Ok(())
}

#[tokio::test]
async fn clock_drives_the_expiry_decision() -> anyhow::Result<()> {
    let fx = setup(date(2024, 6, 1)).await?;
    let id = make_member(
        &fx,
        "border@example.com",
        Some(date(2024, 6, 15)),
        false,
        None,
    )
    .await?;

    // Not yet overdue.
    let report = fx.lifecycle.expire_overdue().await?;
    assert_eq!(report.processed, 0);

    // Two weeks later the same member lapses.
    fx.clock.set(date(2024, 6, 16));
    let report = fx.lifecycle.expire_overdue().await?;
    assert_eq!(report.succeeded, 1);

    let member = fx.members.find_by_id(id).await?.unwrap();
    assert_eq!(member.status, MemberStatus::Inactive);

    Ok(())
}
