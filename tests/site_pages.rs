mod common;

use axum::http::{header, StatusCode};
use hotell::storage::StorageBackend;

use common::*;

#[tokio::test]
async fn test_home_lists_featured_rooms() {
    let app = TestApp::new();
    app.room("Harbour Deluxe", 195);

    let response = app.send(get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Harbour Deluxe"));
    assert!(html.contains("195.00"));
}

#[tokio::test]
async fn test_room_list_filters_by_max_price() {
    let app = TestApp::new();
    app.room("Garden Single", 90);
    app.room("Sea View Suite", 340);

    let html = body_text(app.send(get("/rooms?max_price=100", None)).await).await;
    assert!(html.contains("Garden Single"));
    assert!(!html.contains("Sea View Suite"));
}

#[tokio::test]
async fn test_room_json_describes_the_room() {
    let app = TestApp::new();
    let room = app.room("Harbour Deluxe", 195);

    let body = body_json(app.send(get(&format!("/rooms/{}/json", room.id), None)).await).await;
    assert_eq!(body["name"], "Harbour Deluxe");
    assert_eq!(body["room_type"], "Deluxe");
    assert_eq!(body["price"], "195.00");

    let missing = app.send(get("/rooms/nope/json", None)).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_signs_the_guest_in() {
    let app = TestApp::new();

    let response = app
        .send(post_form(
            "/auth/register",
            None,
            &[
                ("email", "new@example.com"),
                ("username", "newguest"),
                ("password", "correct-horse"),
                ("password_confirm", "correct-horse"),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookies = set_cookies(&response);
    assert!(cookies.contains("hotell_session="));
    assert!(cookies.contains("hotell_flash="));
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let app = TestApp::new();

    let response = app
        .send(post_form(
            "/auth/register",
            None,
            &[
                ("email", "new@example.com"),
                ("username", "newguest"),
                ("password", "correct-horse"),
                ("password_confirm", "battery-staple"),
            ],
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("match"));
}

#[tokio::test]
async fn test_login_follows_next_and_rejects_bad_passwords() {
    let app = TestApp::new();
    app.guest("ann@example.com");

    let response = app
        .send(post_form(
            "/auth/login",
            None,
            &[
                ("email", "ann@example.com"),
                ("password", "wrong-password"),
                ("next", "/bookings"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Invalid email or password."));

    let response = app
        .send(post_form(
            "/auth/login",
            None,
            &[
                ("email", "ann@example.com"),
                ("password", "correct-horse"),
                ("next", "/bookings"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bookings");
    assert!(set_cookies(&response).contains("hotell_session="));
}

#[tokio::test]
async fn test_login_ignores_off_site_next() {
    let app = TestApp::new();
    app.guest("ann@example.com");

    let response = app
        .send(post_form(
            "/auth/login",
            None,
            &[
                ("email", "ann@example.com"),
                ("password", "correct-horse"),
                ("next", "/\\evil.example.com"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let app = TestApp::new();
    let cookie = app.guest("ann@example.com");

    let response = app.send(post_form("/auth/logout", Some(&cookie), &[])).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(set_cookies(&response).contains("hotell_session=;"));

    let response = app.send(get("/bookings", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/auth/login"));
}

#[tokio::test]
async fn test_profile_update_rejects_future_birth_date() {
    let app = TestApp::new();
    let cookie = app.guest("ann@example.com");
    let tomorrow = days_from_now(1).to_string();

    let response = app
        .send(post_form(
            "/profile",
            Some(&cookie),
            &[("phone_number", ""), ("address", ""), ("date_of_birth", &tomorrow)],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(post_form(
            "/profile",
            Some(&cookie),
            &[
                ("phone_number", "+44 20 7946 0958"),
                ("address", "1 Harbour Road"),
                ("date_of_birth", "1990-05-01"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_text(app.send(get("/profile", Some(&cookie))).await).await;
    assert!(html.contains("1 Harbour Road"));
    assert!(html.contains("1990-05-01"));
}

#[tokio::test]
async fn test_media_is_served_from_storage() {
    let app = TestApp::new();
    app.state
        .storage
        .save("room_images/lobby.png", b"not really a png")
        .await
        .unwrap();

    let response = app.send(get("/media/room_images/lobby.png", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(body_text(response).await, "not really a png");

    let missing = app.send(get("/media/room_images/gone.png", None)).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assets_are_embedded() {
    let app = TestApp::new();
    let response = app.send(get("/assets/css/site.css", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
