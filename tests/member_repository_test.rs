use chrono::{Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use rollbook::{
    domain::{
        AttendanceStatus, CreateMemberRequest, MemberFilter, MemberStatus, MembershipType,
        PaymentMethod, UpdateMemberRequest, Zone,
    },
    error::AppError,
    repository::{MemberRepository, NewReceipt, SqliteMemberRepository},
};

async fn setup() -> anyhow::Result<SqliteMemberRepository> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(SqliteMemberRepository::new(pool))
}

fn request(email: &str, zone: Zone) -> CreateMemberRequest {
    CreateMemberRequest {
        first_name: "Test".to_string(),
        last_name: "Member".to_string(),
        email: email.to_string(),
        phone: None,
        zone,
        membership_type: MembershipType::Regular,
        auto_renew: false,
        default_payment_method: None,
    }
}

#[tokio::test]
async fn test_member_crud() -> anyhow::Result<()> {
    let repo = setup().await?;

    let id = Uuid::new_v4();
    let member = repo
        .create(id, request("test@example.com", Zone::North), "<svg/>".to_string())
        .await?;
    assert_eq!(member.id, id);
    assert_eq!(member.email, "test@example.com");
    assert_eq!(member.status, MemberStatus::Pending);
    assert!(member.expiry_date.is_none());

    let found = repo.find_by_id(member.id).await?;
    assert!(found.is_some());
    assert_eq!(found.unwrap().id, member.id);

    let found_by_email = repo.find_by_email("test@example.com").await?;
    assert!(found_by_email.is_some());

    let members = repo.list(10, 0).await?;
    assert_eq!(members.len(), 1);

    let updated = repo
        .update(
            member.id,
            UpdateMemberRequest {
                status: Some(MemberStatus::Active),
                phone: Some("+91 98765 43210".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.status, MemberStatus::Active);
    assert_eq!(updated.phone.as_deref(), Some("+91 98765 43210"));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_email_conflicts() -> anyhow::Result<()> {
    let repo = setup().await?;

    repo.create(
        Uuid::new_v4(),
        request("dup@example.com", Zone::East),
        "<svg/>".to_string(),
    )
    .await?;

    let err = repo
        .create(
            Uuid::new_v4(),
            request("dup@example.com", Zone::West),
            "<svg/>".to_string(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn test_delete_is_soft() -> anyhow::Result<()> {
    let repo = setup().await?;

    let member = repo
        .create(
            Uuid::new_v4(),
            request("gone@example.com", Zone::South),
            "<svg/>".to_string(),
        )
        .await?;

    let deactivated = repo.deactivate(member.id).await?;
    assert_eq!(deactivated.status, MemberStatus::Inactive);

    // The row survives; only the status changes.
    let still_there = repo.find_by_id(member.id).await?;
    assert!(still_there.is_some());

    Ok(())
}

#[tokio::test]
async fn test_filter_by_zone_and_status() -> anyhow::Result<()> {
    let repo = setup().await?;

    let north = repo
        .create(
            Uuid::new_v4(),
            request("north@example.com", Zone::North),
            "<svg/>".to_string(),
        )
        .await?;
    repo.create(
        Uuid::new_v4(),
        request("south@example.com", Zone::South),
        "<svg/>".to_string(),
    )
    .await?;

    repo.update(
        north.id,
        UpdateMemberRequest {
            status: Some(MemberStatus::Active),
            ..Default::default()
        },
    )
    .await?;

    let by_zone = repo
        .filter(MemberFilter {
            zone: Some(Zone::North),
            ..Default::default()
        })
        .await?;
    assert_eq!(by_zone.len(), 1);
    assert_eq!(by_zone[0].email, "north@example.com");

    let active_south = repo
        .filter(MemberFilter {
            zone: Some(Zone::South),
            status: Some(MemberStatus::Active),
            ..Default::default()
        })
        .await?;
    assert!(active_south.is_empty());

    let unfiltered = repo.filter(MemberFilter::default()).await?;
    assert_eq!(unfiltered.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_renewal_writes_history_and_receipt_atomically() -> anyhow::Result<()> {
    let repo = setup().await?;

    let member = repo
        .create(
            Uuid::new_v4(),
            request("renew@example.com", Zone::Central),
            "<svg/>".to_string(),
        )
        .await?;

    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let new_expiry = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let admin_id = Uuid::new_v4();

    let renewed = repo
        .apply_renewal(
            member.id,
            new_expiry,
            Some(admin_id),
            Some("Front desk renewal".to_string()),
            Some(NewReceipt {
                amount_minor: 10_000,
                payment_method: PaymentMethod::Cash,
                transaction_id: None,
                recorded_by: Some(admin_id),
            }),
            now,
        )
        .await?;

    assert_eq!(renewed.expiry_date, Some(new_expiry));
    assert_eq!(renewed.status, MemberStatus::Active);

    let history = repo.renewal_history(member.id).await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].renewed_by, Some(admin_id));
    assert_eq!(history[0].notes.as_deref(), Some("Front desk renewal"));

    let receipts = repo.receipts(member.id).await?;
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].amount_minor, 10_000);
    assert_eq!(receipts[0].payment_method, PaymentMethod::Cash);

    Ok(())
}

#[tokio::test]
async fn test_expiry_window_queries() -> anyhow::Result<()> {
    let repo = setup().await?;
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    let overdue = repo
        .create(
            Uuid::new_v4(),
            request("overdue@example.com", Zone::North),
            "<svg/>".to_string(),
        )
        .await?;
    repo.update(
        overdue.id,
        UpdateMemberRequest {
            status: Some(MemberStatus::Active),
            expiry_date: Some(now - Duration::days(1)),
            ..Default::default()
        },
    )
    .await?;

    let mut soon_request = request("soon@example.com", Zone::North);
    soon_request.auto_renew = true;
    let soon = repo
        .create(Uuid::new_v4(), soon_request, "<svg/>".to_string())
        .await?;
    repo.update(
        soon.id,
        UpdateMemberRequest {
            status: Some(MemberStatus::Active),
            expiry_date: Some(now + Duration::days(3)),
            ..Default::default()
        },
    )
    .await?;

    let overdue_members = repo.list_overdue(now).await?;
    assert_eq!(overdue_members.len(), 1);
    assert_eq!(overdue_members[0].id, overdue.id);

    let due = repo.list_due_for_auto_renewal(now + Duration::days(7)).await?;
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, soon.id);

    let in_window = repo
        .list_expiring_between(now + Duration::days(2), now + Duration::days(4))
        .await?;
    assert_eq!(in_window.len(), 1);

    let outside_window = repo
        .list_expiring_between(now + Duration::days(10), now + Duration::days(11))
        .await?;
    assert!(outside_window.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_attendance_is_unique_per_event() -> anyhow::Result<()> {
    let repo = setup().await?;

    let member = repo
        .create(
            Uuid::new_v4(),
            request("attendee@example.com", Zone::West),
            "<svg/>".to_string(),
        )
        .await?;
    let event_id = Uuid::new_v4();
    let now = Utc::now();

    let attendance = repo
        .record_attendance(member.id, event_id, AttendanceStatus::Present, now)
        .await?;
    assert_eq!(attendance.status, AttendanceStatus::Present);

    let err = repo
        .record_attendance(member.id, event_id, AttendanceStatus::Absent, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let all = repo.attendances(member.id).await?;
    assert_eq!(all.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_password_hashing() -> anyhow::Result<()> {
    use rollbook::auth::AuthService;

    let password = "my_secure_password";
    let hash = AuthService::hash_password(password)?;

    assert!(AuthService::verify_password(password, &hash)?);
    assert!(!AuthService::verify_password("wrong_password", &hash)?);

    Ok(())
}
