use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use gatepass::config::{Config, SecurityConfig};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    state: Arc<gatepass::api::AppState>,
    router: Router,
    hostel_id: i32,
    hosteler_id: i32,
    student_key: String,
    warden_key: String,
    guard_key: String,
}

/// Boots an in-memory app with one hostel, one hosteler and one user per
/// role. Returns the API keys to act as each of them.
async fn spawn_app() -> TestApp {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = gatepass::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    let router = gatepass::api::router(state.clone()).await;

    let store = state.store();
    let security = SecurityConfig::default();

    let hostel = store
        .add_hostel("Shivalik House", "shivalik", "male")
        .await
        .unwrap();
    let hosteler = store
        .add_hosteler(&gatepass::db::NewHosteler {
            name: "Arjun Mehta".to_string(),
            email: "arjun@college.edu".to_string(),
            roll_number: "21B042".to_string(),
            hostel_id: hostel.id,
            room_number: "B-214".to_string(),
        })
        .await
        .unwrap();

    let student = store
        .create_user("arjun", "arjun@college.edu", "pw-student", "student", &security)
        .await
        .unwrap();
    let warden = store
        .create_user("warden1", "warden@college.edu", "pw-warden", "warden", &security)
        .await
        .unwrap();
    let guard = store
        .create_user("guard1", "guard@college.edu", "pw-guard", "guard", &security)
        .await
        .unwrap();

    TestApp {
        state,
        router,
        hostel_id: hostel.id,
        hosteler_id: hosteler.id,
        student_key: student.api_key,
        warden_key: warden.api_key,
        guard_key: guard.api_key,
    }
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    api_key: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Api-Key", api_key);
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

fn outing_payload() -> serde_json::Value {
    serde_json::json!({
        "room_number": "B-214",
        "address": "City Mall, Sector 17",
        "reason": "outing",
        "expected_out_time": "2026-09-05T10:00:00+05:30",
        "expected_in_time": "2026-09-05T18:00:00+05:30"
    })
}

#[tokio::test]
async fn test_full_lifecycle_to_processed() {
    let app = spawn_app().await;

    // Student creates a request
    let (status, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(outing_payload()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "pending");
    // Outing validity ends the same day as the declared return
    assert_eq!(json["data"]["valid_till"], "2026-09-05T23:59:59.999+05:30");
    let pass_id = json["data"]["id"].as_i64().unwrap();

    // Warden approves
    let (status, json) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/decision"),
        &app.warden_key,
        Some(serde_json::json!({"action": "approve"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "approved");

    // Guard records the exit
    let (status, json) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/gate"),
        &app.guard_key,
        Some(serde_json::json!({"event": "exit"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "in_use");
    assert!(json["data"]["actual_out_time"].is_string());
    assert!(json["data"]["actual_in_time"].is_null());

    // Guard records the entry
    let (status, json) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/gate"),
        &app.guard_key,
        Some(serde_json::json!({"event": "entry"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "processed");
    assert!(json["data"]["actual_in_time"].is_string());
}

#[tokio::test]
async fn test_rejection_is_terminal() {
    let app = spawn_app().await;

    let (_, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(outing_payload()),
    )
    .await;
    let pass_id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/decision"),
        &app.warden_key,
        Some(serde_json::json!({"action": "reject"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "rejected");

    // A second decision finds nothing pending
    let (status, json) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/decision"),
        &app.warden_key,
        Some(serde_json::json!({"action": "approve"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "failed_precondition");

    // Nor can the guard let a rejected pass out
    let (status, json) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/gate"),
        &app.guard_key,
        Some(serde_json::json!({"event": "exit"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "failed_precondition");
}

#[tokio::test]
async fn test_gate_requires_approval_first() {
    let app = spawn_app().await;

    let (_, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(outing_payload()),
    )
    .await;
    let pass_id = json["data"]["id"].as_i64().unwrap();

    // Still pending: neither exit nor entry may be recorded
    for event in ["exit", "entry"] {
        let (status, json) = request(
            &app.router,
            "POST",
            &format!("/api/outpasses/{pass_id}/gate"),
            &app.guard_key,
            Some(serde_json::json!({"event": event})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "event {event}");
        assert_eq!(json["kind"], "failed_precondition");
    }
}

#[tokio::test]
async fn test_duplicate_gate_events_keep_first_timestamp() {
    let app = spawn_app().await;

    let (_, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(outing_payload()),
    )
    .await;
    let pass_id = json["data"]["id"].as_i64().unwrap();

    request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/decision"),
        &app.warden_key,
        Some(serde_json::json!({"action": "approve"})),
    )
    .await;

    let (_, json) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/gate"),
        &app.guard_key,
        Some(serde_json::json!({"event": "exit"})),
    )
    .await;
    let first_out = json["data"]["actual_out_time"].as_str().unwrap().to_string();

    // Replayed exit scan is refused and the stored timestamp survives
    let (status, json) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/gate"),
        &app.guard_key,
        Some(serde_json::json!({"event": "exit"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "failed_precondition");

    let stored = app
        .state
        .store()
        .get_outpass(i32::try_from(pass_id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.actual_out_time.as_deref(), Some(first_out.as_str()));
}

#[tokio::test]
async fn test_role_gating() {
    let app = spawn_app().await;

    // Guard cannot create, student cannot decide, warden cannot scan
    let (status, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.guard_key,
        Some(outing_payload()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "forbidden");

    let (_, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(outing_payload()),
    )
    .await;
    let pass_id = json["data"]["id"].as_i64().unwrap();

    let (status, _) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/decision"),
        &app.student_key,
        Some(serde_json::json!({"action": "approve"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app.router,
        "POST",
        &format!("/api/outpasses/{pass_id}/gate"),
        &app.warden_key,
        Some(serde_json::json!({"event": "exit"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Student cannot read the warden's hostel listing
    let (status, _) = request(
        &app.router,
        "GET",
        &format!("/api/hostels/{}/outpasses", app.hostel_id),
        &app.student_key,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_banned_student_cannot_create() {
    let app = spawn_app().await;

    app.state
        .store()
        .set_hosteler_ban(app.hosteler_id, true, Some("2026-12-31T00:00:00Z"))
        .await
        .unwrap();

    let (status, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(outing_payload()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "forbidden");
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("2026-12-31T00:00:00Z")
    );
}

#[tokio::test]
async fn test_create_validation_reports_all_problems() {
    let app = spawn_app().await;

    let (status, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(serde_json::json!({
            "room_number": "",
            "address": "somewhere",
            "reason": "vacation",
            "expected_out_time": "2026-09-05T10:00:00+05:30",
            "expected_in_time": "not-a-timestamp"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_argument");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("room_number"));
    assert!(message.contains("reason"));
    assert!(message.contains("expected_in_time"));
}

#[tokio::test]
async fn test_extended_stay_validity_window() {
    let app = spawn_app().await;

    let (status, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(serde_json::json!({
            "room_number": "B-214",
            "address": "Home, Jaipur",
            "reason": "home",
            "expected_out_time": "2026-09-04T08:00:00+05:30",
            "expected_in_time": "2026-09-08T20:00:00+05:30"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // Return date plus the 4-day grace for home leave
    assert_eq!(json["data"]["valid_till"], "2026-09-12T23:59:59.999+05:30");
}

#[tokio::test]
async fn test_room_side_effect_on_create() {
    let app = spawn_app().await;

    let mut payload = outing_payload();
    payload["room_number"] = serde_json::json!("C-101");

    let (status, _) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let hosteler = app
        .state
        .store()
        .get_hosteler(app.hosteler_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hosteler.room_number, "C-101");
}

#[tokio::test]
async fn test_student_history_and_detail_access() {
    let app = spawn_app().await;

    let (_, json) = request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(outing_payload()),
    )
    .await;
    let pass_id = json["data"]["id"].as_i64().unwrap();

    let (status, json) = request(
        &app.router,
        "GET",
        "/api/outpasses/mine",
        &app.student_key,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    // The owner can read the detail view
    let (status, json) = request(
        &app.router,
        "GET",
        &format!("/api/outpasses/{pass_id}"),
        &app.student_key,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["student"]["roll_number"], "21B042");
    assert_eq!(json["data"]["hostel"]["slug"], "shivalik");

    // Another student cannot
    let other = app
        .state
        .store()
        .create_user(
            "priya",
            "priya@college.edu",
            "pw-other",
            "student",
            &SecurityConfig::default(),
        )
        .await
        .unwrap();
    let (status, json) = request(
        &app.router,
        "GET",
        &format!("/api/outpasses/{pass_id}"),
        &other.api_key,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["kind"], "forbidden");
}

#[tokio::test]
async fn test_hostel_listing_search_and_missing_hostel() {
    let app = spawn_app().await;

    request(
        &app.router,
        "POST",
        "/api/outpasses",
        &app.student_key,
        Some(outing_payload()),
    )
    .await;

    let (status, json) = request(
        &app.router,
        "GET",
        &format!("/api/hostels/{}/outpasses", app.hostel_id),
        &app.warden_key,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["student"]["name"], "Arjun Mehta");

    // Roll-number search matches
    let (_, json) = request(
        &app.router,
        "GET",
        &format!("/api/hostels/{}/outpasses?query=21B0", app.hostel_id),
        &app.warden_key,
        None,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    // Non-matching search returns an empty page
    let (_, json) = request(
        &app.router,
        "GET",
        &format!("/api/hostels/{}/outpasses?query=zzz", app.hostel_id),
        &app.warden_key,
        None,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);

    // Unknown hostel is a 404, not an empty page
    let (status, json) = request(
        &app.router,
        "GET",
        "/api/hostels/9999/outpasses",
        &app.warden_key,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn test_unknown_outpass_is_not_found() {
    let app = spawn_app().await;

    let (status, json) = request(
        &app.router,
        "POST",
        "/api/outpasses/4242/decision",
        &app.warden_key,
        Some(serde_json::json!({"action": "approve"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");

    let (status, json) = request(
        &app.router,
        "GET",
        "/api/outpasses/4242",
        &app.warden_key,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}
