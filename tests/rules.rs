use std::sync::Arc;

use hallbook::config::BookingRules;
use hallbook::db::{MemoryStore, Store};
use hallbook::error::HallError;
use hallbook::models::booking::conflict::TimeSlot;
use hallbook::models::booking::{AdminDecision, Booking, BookingRequest, BookingStatus, NewBooking};
use hallbook::models::user::{NewUser, Role, User, UserStatus};
use time::macros::{date, datetime, time};
use time::{Duration, OffsetDateTime, Time};

/// 2099-03-15 10:00 in the hall's time zone.
const STARTS_AT: OffsetDateTime = datetime!(2099-03-15 04:30 UTC);
const CREATED: OffsetDateTime = datetime!(2099-01-01 00:00 UTC);

async fn requester(store: &dyn Store) -> User {
    let mut tx = store.begin().await.unwrap();
    let user = tx
        .insert_user(
            &NewUser {
                name: "Leader".to_owned(),
                email: "leader@college.edu".to_owned(),
                pass_hash: String::new(),
                role: Role::ClubLeader,
                status: UserStatus::Approved,
            },
            CREATED,
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    user
}

/// Stores a pending booking without any checks.
async fn stored_booking(store: &dyn Store, user: &User, start: Time, end: Time) -> Booking {
    let mut tx = store.begin().await.unwrap();
    let booking = tx
        .insert_booking(
            user.id,
            &BookingRequest {
                club_name: "Chess Club".to_owned(),
                title: "Tournament".to_owned(),
                description: None,
                slot: TimeSlot::new(date!(2099 - 03 - 15), start, end).unwrap(),
                terms_accepted: true,
            },
            CREATED,
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    booking
}

async fn approved_booking(store: &dyn Store, user: &User) -> Booking {
    let booking = stored_booking(store, user, time!(10:00), time!(12:00)).await;
    Booking::approve(
        booking.id,
        AdminDecision::default(),
        &BookingRules::default(),
        CREATED,
        store,
    )
    .await
    .unwrap();

    booking
}

#[tokio::test]
async fn approved_bookings_cancel_more_than_a_day_ahead() {
    let store = MemoryStore::new();
    let user = requester(&store).await;
    let booking = approved_booking(&store, &user).await;

    let details = Booking::reject(
        booking.id,
        AdminDecision {
            admin_comments: Some("Hall under maintenance".to_owned()),
        },
        &BookingRules::default(),
        STARTS_AT - Duration::hours(25),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(details.booking.status, BookingStatus::Rejected);
    assert_eq!(
        details.booking.admin_comments.as_deref(),
        Some("Hall under maintenance")
    );
}

#[tokio::test]
async fn approved_bookings_cannot_cancel_within_a_day() {
    let store = MemoryStore::new();
    let user = requester(&store).await;
    let booking = approved_booking(&store, &user).await;

    for now in [
        STARTS_AT - Duration::hours(23),
        STARTS_AT - Duration::hours(24),
        STARTS_AT + Duration::hours(1),
    ] {
        let error = Booking::reject(
            booking.id,
            AdminDecision::default(),
            &BookingRules::default(),
            now,
            &store,
        )
        .await
        .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Cannot cancel approved booking less than 24 hours before the event start time."
        );
    }

    // nothing changed
    let details = Booking::with_id(booking.id, &store).await.unwrap();
    assert_eq!(details.booking.status, BookingStatus::Approved);
}

#[tokio::test]
async fn pending_bookings_can_be_rejected_any_time() {
    let store = MemoryStore::new();
    let user = requester(&store).await;
    let booking = stored_booking(&store, &user, time!(10:00), time!(11:00)).await;

    let details = Booking::reject(
        booking.id,
        AdminDecision::default(),
        &BookingRules::default(),
        STARTS_AT - Duration::minutes(5),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(details.booking.status, BookingStatus::Rejected);
}

#[tokio::test]
async fn approval_is_blocked_by_approved_neighbours_only() {
    let store = MemoryStore::new();
    let user = requester(&store).await;
    let rules = BookingRules::default();

    // overlapping requests that got in before the checks, e.g. from an import
    let first = stored_booking(&store, &user, time!(10:00), time!(11:00)).await;
    let second = stored_booking(&store, &user, time!(11:30), time!(12:30)).await;

    Booking::approve(first.id, AdminDecision::default(), &rules, CREATED, &store)
        .await
        .unwrap();

    let error = Booking::approve(second.id, AdminDecision::default(), &rules, CREATED, &store)
        .await
        .unwrap_err();
    match error {
        HallError::Conflict { message, conflicting } => {
            assert_eq!(
                message,
                "Cannot approve: This time slot conflicts with an already approved booking."
            );
            assert_eq!(conflicting.len(), 1);
            assert_eq!(conflicting[0].id, first.id);
        }
        other => panic!("expected a conflict, got {other:?}"),
    }

    let stats = Booking::stats(&store).await.unwrap();
    assert_eq!(stats.approved_bookings, 1);
    assert_eq!(stats.pending_bookings, 1);
}

#[tokio::test]
async fn a_shorter_buffer_allows_closer_bookings() {
    let store = MemoryStore::new();
    let user = requester(&store).await;
    let rules = BookingRules {
        buffer: Duration::minutes(15),
        ..BookingRules::default()
    };
    stored_booking(&store, &user, time!(10:00), time!(11:00)).await;

    let request = |start: &str, end: &str| NewBooking {
        club_name: Some("Quiz Club".to_owned()),
        title: Some("Finals".to_owned()),
        date: Some("2099-03-15".to_owned()),
        start_time: Some(start.to_owned()),
        end_time: Some(end.to_owned()),
        terms_accepted: Some(true),
        ..NewBooking::default()
    };

    assert!(Booking::submit(&user, request("11:10", "12:00"), &rules, CREATED, &store)
        .await
        .is_err());
    assert!(Booking::submit(&user, request("11:15", "12:00"), &rules, CREATED, &store)
        .await
        .is_ok());
}

#[tokio::test]
async fn simultaneous_requests_for_one_slot_admit_one() {
    let store = Arc::new(MemoryStore::new());
    let user = requester(&*store).await;
    let rules = BookingRules::default();

    let request = || NewBooking {
        club_name: Some("Film Society".to_owned()),
        title: Some("Screening".to_owned()),
        date: Some("2099-03-15".to_owned()),
        start_time: Some("18:00".to_owned()),
        end_time: Some("20:00".to_owned()),
        terms_accepted: Some(true),
        ..NewBooking::default()
    };

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let user = user.clone();
            let new_booking = request();
            tokio::spawn(async move {
                Booking::submit(&user, new_booking, &rules, CREATED, &*store).await
            })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(HallError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 3);
}

#[tokio::test]
async fn public_calendar_skips_past_days() {
    let store = MemoryStore::new();
    let user = requester(&store).await;
    approved_booking(&store, &user).await;
    let rules = BookingRules::default();

    let before = Booking::public_calendar(&rules, STARTS_AT - Duration::days(1), &store)
        .await
        .unwrap();
    assert_eq!(before.len(), 1);

    // still listed later the same day, hall time
    let same_day = Booking::public_calendar(&rules, STARTS_AT + Duration::hours(12), &store)
        .await
        .unwrap();
    assert_eq!(same_day.len(), 1);

    let after = Booking::public_calendar(&rules, STARTS_AT + Duration::days(1), &store)
        .await
        .unwrap();
    assert!(after.is_empty());
}

#[tokio::test]
async fn bootstrap_admin_is_created_once() {
    let store = MemoryStore::new();
    let account = hallbook::config::AdminAccount {
        name: "Admin".to_owned(),
        email: "Admin@College.edu".to_owned(),
        password: "first password".to_owned(),
    };

    let first = User::bootstrap_admin(&account, CREATED, &store).await.unwrap();
    let second = User::bootstrap_admin(
        &hallbook::config::AdminAccount {
            password: "second password".to_owned(),
            ..account
        },
        CREATED,
        &store,
    )
    .await
    .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.email, "admin@college.edu");
    assert_eq!(second.role, Role::Admin);
    assert_eq!(second.status, UserStatus::Approved);
    assert!(hallbook::util::verify_password("second password", &second.pass_hash).unwrap());
}
