mod common;

use axum::http::StatusCode;
use hallbook::models::user::Role;
use serde_json::json;

use common::{booking_body, TestApp, ADMIN_EMAIL};

const DAY: &str = "2099-03-15";

#[tokio::test]
async fn requesters_can_book_the_hall() {
    let app = TestApp::new();
    let token = app.login_as("leader@college.edu", Role::ClubLeader).await;

    let (status, body) = app
        .post("/api/bookings", Some(&token), booking_body(DAY, "10:00", "11:00"))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["message"],
        "Booking created successfully! Admin has been notified and will review your request."
    );
    assert_eq!(body["booking"]["status"], "pending");
    assert_eq!(body["booking"]["start_time"], "10:00");
    assert_eq!(body["booking"]["club_name"], "Robotics Club");

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.address, ADMIN_EMAIL);

    let (status, mine) = app.get("/api/bookings", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn booking_requires_a_requester() {
    let app = TestApp::new();
    let admin = app.login_as("admin@college.edu", Role::Admin).await;

    let (status, _) = app
        .post("/api/bookings", None, booking_body(DAY, "10:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post("/api/bookings", Some(&admin), booking_body(DAY, "10:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["requiredRole"], "club_leader, faculty");

    let (status, _) = app
        .post("/api/bookings", Some("not-a-token"), booking_body(DAY, "10:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let app = TestApp::new();
    let token = app.login_as("faculty@college.edu", Role::Faculty).await;

    let mut missing_title = booking_body(DAY, "10:00", "11:00");
    missing_title["title"] = json!("");
    let (status, body) = app.post("/api/bookings", Some(&token), missing_title).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Please enter all required fields: Club Name, Title, Date, Start Time, End Time, and accept terms."
    );

    let mut no_terms = booking_body(DAY, "10:00", "11:00");
    no_terms["termsAccepted"] = json!(false);
    let (status, body) = app.post("/api/bookings", Some(&token), no_terms).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You must accept the terms and conditions.");

    let (status, body) = app
        .post("/api/bookings", Some(&token), booking_body(DAY, "11:00", "10:00"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "End time must be after start time.");

    let (status, body) = app
        .post("/api/bookings", Some(&token), booking_body("2001-01-01", "10:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Booking date and time must be in the future.");

    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn overlapping_requests_conflict() {
    let app = TestApp::new();
    let first = app.login_as("first@college.edu", Role::ClubLeader).await;
    let second = app.login_as("second@college.edu", Role::Faculty).await;

    let (status, _) = app
        .post("/api/bookings", Some(&first), booking_body(DAY, "10:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // inside the hour of buffer after the first booking
    let (status, body) = app
        .post("/api/bookings", Some(&second), booking_body(DAY, "11:30", "12:30"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);
    assert_eq!(body["conflictingBookings"][0]["start_time"], "10:00");
    assert_eq!(body["conflictingBookings"][0]["end_time"], "11:00");

    // exactly one hour after is fine
    let (status, _) = app
        .post("/api/bookings", Some(&second), booking_body(DAY, "12:00", "13:00"))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // and a different day never conflicts
    let (status, _) = app
        .post("/api/bookings", Some(&second), booking_body("2099-03-16", "10:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn owners_can_edit_pending_bookings() {
    let app = TestApp::new();
    let owner = app.login_as("owner@college.edu", Role::ClubLeader).await;
    let other = app.login_as("other@college.edu", Role::ClubLeader).await;

    let (_, created) = app
        .post("/api/bookings", Some(&owner), booking_body(DAY, "10:00", "11:00"))
        .await;
    let id = created["booking"]["id"].as_i64().unwrap();
    let (_, _) = app
        .post("/api/bookings", Some(&other), booking_body(DAY, "15:00", "16:00"))
        .await;

    // moving within its own buffer doesn't conflict with itself
    let (status, body) = app
        .put(
            &format!("/api/bookings/{id}"),
            Some(&owner),
            json!({ "startTime": "10:30", "endTime": "11:30", "title": "Robot Wars II" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["start_time"], "10:30");
    assert_eq!(body["booking"]["title"], "Robot Wars II");
    assert_eq!(body["booking"]["club_name"], "Robotics Club");

    let (status, body) = app
        .put(
            &format!("/api/bookings/{id}"),
            Some(&owner),
            json!({ "startTime": "13:30", "endTime": "14:30" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        "The updated time slot overlaps with an existing booking. Please choose another time."
    );

    let (status, _) = app
        .put(&format!("/api/bookings/{id}"), Some(&other), json!({ "title": "Mine now" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owners_can_withdraw_pending_bookings() {
    let app = TestApp::new();
    let owner = app.login_as("owner@college.edu", Role::Faculty).await;

    let (_, created) = app
        .post("/api/bookings", Some(&owner), booking_body(DAY, "10:00", "11:00"))
        .await;
    let id = created["booking"]["id"].as_i64().unwrap();

    let (status, body) = app.delete(&format!("/api/bookings/{id}"), Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "cancelled");

    let (status, body) = app.delete(&format!("/api/bookings/{id}"), Some(&owner)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Booking status is 'cancelled'. Only 'pending' bookings can be withdrawn."
    );

    let (status, body) = app
        .put(&format!("/api/bookings/{id}"), Some(&owner), json!({ "title": "Again" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Booking status is 'cancelled'. Only pending bookings can be updated."
    );

    // a withdrawn booking frees its slot
    let (status, _) = app
        .post("/api/bookings", Some(&owner), booking_body(DAY, "10:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn admins_approve_and_reject_bookings() {
    let app = TestApp::new();
    let admin = app.login_as("admin@college.edu", Role::Admin).await;
    let leader = app.login_as("leader@college.edu", Role::ClubLeader).await;

    let (_, created) = app
        .post("/api/bookings", Some(&leader), booking_body(DAY, "10:00", "11:00"))
        .await;
    let id = created["booking"]["id"].as_i64().unwrap();

    let (status, pending) = app.get("/api/admin/bookings/pending", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending[0]["user_email"], "leader@college.edu");

    let (status, body) = app
        .put(
            &format!("/api/admin/bookings/{id}/approve"),
            Some(&admin),
            json!({ "adminComments": "Enjoy" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Booking approved successfully.");
    assert_eq!(body["booking"]["status"], "approved");
    assert_eq!(body["booking"]["admin_comments"], "Enjoy");

    let sent = app.mailer.sent();
    assert_eq!(sent.last().unwrap().to.address, "leader@college.edu");
    assert!(sent.last().unwrap().html.contains("Enjoy"));

    let (status, body) = app
        .put(&format!("/api/admin/bookings/{id}/approve"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Booking status is 'approved'. Only 'pending' bookings can be approved."
    );

    // far enough away to cancel
    let (status, body) = app
        .request(
            axum::http::Method::PUT,
            &format!("/api/admin/bookings/{id}/reject"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "rejected");

    let (status, body) = app
        .put(&format!("/api/admin/bookings/{id}/reject"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Booking status is 'rejected'. Only 'pending' or 'approved' bookings can be cancelled."
    );

    let (status, _) = app.get("/api/admin/bookings/pending", Some(&leader)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn approved_bookings_fill_the_public_calendar() {
    let app = TestApp::new();
    let admin = app.login_as("admin@college.edu", Role::Admin).await;
    let leader = app.login_as("leader@college.edu", Role::ClubLeader).await;

    let (_, first) = app
        .post("/api/bookings", Some(&leader), booking_body(DAY, "10:00", "11:00"))
        .await;
    let first = first["booking"]["id"].as_i64().unwrap();
    let (_, second) = app
        .post("/api/bookings", Some(&leader), booking_body(DAY, "14:00", "15:00"))
        .await;
    let second = second["booking"]["id"].as_i64().unwrap();

    let (status, _) = app
        .put(&format!("/api/admin/bookings/{first}/approve"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .put(&format!("/api/admin/bookings/{second}/approve"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, public) = app.get("/api/bookings/public", None).await;
    assert_eq!(status, StatusCode::OK);
    let public = public.as_array().unwrap();
    assert_eq!(public.len(), 2);
    assert_eq!(public[0]["start_time"], "10:00");
    assert_eq!(public[1]["start_time"], "14:00");
    assert!(public[0].get("user_id").is_none());

    let (status, stats) = app.get("/api/admin/bookings/stats", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_bookings"], 2);
    assert_eq!(stats["approved_bookings"], 2);

    let (status, details) = app
        .get(&format!("/api/admin/bookings/{first}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["user_name"], "leader");
    assert_eq!(details["user_role"], "club_leader");

    let (status, _) = app.get("/api/admin/bookings/999", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn email_failures_do_not_block_bookings() {
    let app = TestApp::with_broken_mailer();
    let admin = app.login_as("admin@college.edu", Role::Admin).await;
    let leader = app.login_as("leader@college.edu", Role::ClubLeader).await;

    let (status, created) = app
        .post("/api/bookings", Some(&leader), booking_body(DAY, "10:00", "11:00"))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = created["booking"]["id"].as_i64().unwrap();
    let (status, body) = app
        .put(&format!("/api/admin/bookings/{id}/approve"), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "approved");
}
