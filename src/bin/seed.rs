use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use rollbook::{
    auth::AuthService,
    domain::{
        AttendanceStatus, CreateEventRequest, CreateMemberRequest, CreateTicketType,
        CreateUserRequest, MemberStatus, MembershipType, PaymentMethod, Role,
        UpdateMemberRequest, Zone,
    },
    qr,
    repository::{
        EventRepository, MemberRepository, SqliteEventRepository, SqliteMemberRepository,
        SqliteUserRepository, UserRepository,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Starting database seeding...");

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:rollbook.db".to_string());

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    println!("Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let member_repo = SqliteMemberRepository::new(db_pool.clone());
    let user_repo = SqliteUserRepository::new(db_pool.clone());
    let event_repo = SqliteEventRepository::new(db_pool.clone());

    println!("Creating users and members...");

    user_repo
        .create(CreateUserRequest {
            email: "admin@rollbook.local".to_string(),
            password_hash: AuthService::hash_password("admin123")?,
            role: Role::Admin,
            member_id: None,
            is_verified: true,
        })
        .await?;
    println!("  Created admin user (admin@rollbook.local / admin123)");

    let alice_id = Uuid::new_v4();
    let alice = member_repo
        .create(
            alice_id,
            CreateMemberRequest {
                first_name: "Alice".to_string(),
                last_name: "Johnson".to_string(),
                email: "alice@example.com".to_string(),
                phone: Some("+91 98765 43210".to_string()),
                zone: Zone::North,
                membership_type: MembershipType::Premium,
                auto_renew: true,
                default_payment_method: Some(PaymentMethod::Razorpay),
            },
            qr::member_badge_svg(alice_id)?,
        )
        .await?;
    member_repo
        .update(
            alice.id,
            UpdateMemberRequest {
                status: Some(MemberStatus::Active),
                expiry_date: Some(Utc::now() + Duration::days(365)),
                ..Default::default()
            },
        )
        .await?;

    let bob_id = Uuid::new_v4();
    let bob = member_repo
        .create(
            bob_id,
            CreateMemberRequest {
                first_name: "Bob".to_string(),
                last_name: "Smith".to_string(),
                email: "bob@example.com".to_string(),
                phone: None,
                zone: Zone::South,
                membership_type: MembershipType::Student,
                auto_renew: false,
                default_payment_method: Some(PaymentMethod::Cash),
            },
            qr::member_badge_svg(bob_id)?,
        )
        .await?;
    member_repo
        .update(
            bob.id,
            UpdateMemberRequest {
                status: Some(MemberStatus::Active),
                expiry_date: Some(Utc::now() + Duration::days(180)),
                ..Default::default()
            },
        )
        .await?;

    // Charlie's membership has lapsed; exercises the expiry sweep.
    let charlie_id = Uuid::new_v4();
    let charlie = member_repo
        .create(
            charlie_id,
            CreateMemberRequest {
                first_name: "Charlie".to_string(),
                last_name: "Brown".to_string(),
                email: "charlie@example.com".to_string(),
                phone: None,
                zone: Zone::Central,
                membership_type: MembershipType::Regular,
                auto_renew: false,
                default_payment_method: None,
            },
            qr::member_badge_svg(charlie_id)?,
        )
        .await?;
    member_repo
        .update(
            charlie.id,
            UpdateMemberRequest {
                status: Some(MemberStatus::Active),
                expiry_date: Some(Utc::now() - Duration::days(30)),
                ..Default::default()
            },
        )
        .await?;

    // Dave stays Pending, no expiry yet.
    let dave_id = Uuid::new_v4();
    member_repo
        .create(
            dave_id,
            CreateMemberRequest {
                first_name: "Dave".to_string(),
                last_name: "Wilson".to_string(),
                email: "dave@example.com".to_string(),
                phone: None,
                zone: Zone::West,
                membership_type: MembershipType::Regular,
                auto_renew: false,
                default_payment_method: None,
            },
            qr::member_badge_svg(dave_id)?,
        )
        .await?;

    user_repo
        .create(CreateUserRequest {
            email: "alice@example.com".to_string(),
            password_hash: AuthService::hash_password("password123")?,
            role: Role::Member,
            member_id: Some(alice.id),
            is_verified: true,
        })
        .await?;

    println!("  Created 4 test members");

    println!("Creating events...");

    let meeting = event_repo
        .create(CreateEventRequest {
            title: "Monthly General Meeting".to_string(),
            description: Some("Regular monthly meeting to discuss chapter business.".to_string()),
            start_date: Utc::now() + Duration::days(7),
            end_date: Some(Utc::now() + Duration::days(7) + Duration::hours(2)),
            location: Some("Community Hall".to_string()),
            max_attendees: Some(100),
            fee_minor: None,
            organizer_id: None,
            ticket_types: vec![],
        })
        .await?;

    let workshop = event_repo
        .create(CreateEventRequest {
            title: "Fundraising Gala".to_string(),
            description: Some("Annual fundraising dinner with guest speakers.".to_string()),
            start_date: Utc::now() + Duration::days(21),
            end_date: Some(Utc::now() + Duration::days(21) + Duration::hours(4)),
            location: Some("Grand Ballroom".to_string()),
            max_attendees: Some(200),
            fee_minor: Some(50_000),
            organizer_id: None,
            ticket_types: vec![
                CreateTicketType {
                    name: "Standard".to_string(),
                    price_minor: 50_000,
                    quantity_available: Some(150),
                },
                CreateTicketType {
                    name: "Patron".to_string(),
                    price_minor: 150_000,
                    quantity_available: Some(50),
                },
            ],
        })
        .await?;

    event_repo.register_attendee(meeting.id, alice.id).await?;
    event_repo.register_attendee(meeting.id, bob.id).await?;
    event_repo.register_attendee(workshop.id, alice.id).await?;

    member_repo
        .record_attendance(alice.id, meeting.id, AttendanceStatus::Present, Utc::now())
        .await?;

    println!("  Created 2 events with registrations");

    println!("\nDatabase seeding complete!");
    println!("\nTest credentials:");
    println!("  Admin: admin@rollbook.local / admin123");
    println!("  Member: alice@example.com / password123");

    Ok(())
}
