//! HTTP-level coverage for the ERP client against a mock server.

use punchbridge_core::{EmployeeDirectory, RemoteCheckins, RemoteTerminalDirectory};
use punchbridge_domain::{
    BridgeError, CheckinPayload, NewTerminal, PunchDirection, PushOutcome, RemoteAuth,
    RemoteCredentials,
};
use punchbridge_infra::ErpClient;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ErpClient {
    ErpClient::new(&RemoteCredentials {
        base_url: server.uri(),
        auth: RemoteAuth::Token { key: "api-key".to_string(), secret: "api-secret".to_string() },
    })
    .expect("client builds")
}

fn checkin_payload() -> CheckinPayload {
    CheckinPayload {
        employee: "HR-EMP-00001".to_string(),
        time: "2025-03-10 09:00:00".to_string(),
        log_type: PunchDirection::In,
        device_id: "10.0.0.5:4370".to_string(),
    }
}

#[tokio::test]
async fn directory_fetch_sends_token_auth_and_unwraps_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Employee"))
        .and(header("Authorization", "token api-key:api-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "name": "HR-EMP-00001", "attendance_device_id": "7" },
                { "name": "HR-EMP-00002", "attendance_device_id": null }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let employees = client.fetch_directory().await.expect("directory fetched");

    assert_eq!(employees.len(), 2);
    assert_eq!(employees[0].attendance_device_id.as_deref(), Some("7"));
    assert!(employees[1].attendance_device_id.is_none());
}

#[tokio::test]
async fn checkin_exists_inspects_the_filtered_list() {
    let server = MockServer::start().await;
    // Only one mock is mounted, so matching on the method alone is enough;
    // the checkin resource path contains a space and encoding differs by stack.
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "name": "CHK-1" }] })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let exists = client
        .checkin_exists("HR-EMP-00001", "2025-03-10 09:00:00")
        .await
        .expect("query runs");
    assert!(exists);
}

#[tokio::test]
async fn checkin_exists_escapes_quotes_in_the_employee_name() {
    let server = MockServer::start().await;
    let employee = r#"Dwayne "The Clock" Johnson"#;
    let expected =
        serde_json::json!([["employee", "=", employee], ["time", "=", "2025-03-10 09:00:00"]])
            .to_string();
    // The mock only answers when the filters parameter is the well-formed
    // JSON expression; a naively interpolated string would miss and 404.
    Mock::given(method("GET"))
        .and(query_param("filters", expected.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let exists = client
        .checkin_exists(employee, "2025-03-10 09:00:00")
        .await
        .expect("query runs");
    assert!(!exists);
}

#[tokio::test]
async fn create_checkin_posts_fixed_coordinates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "employee": "HR-EMP-00001",
            "time": "2025-03-10 09:00:00",
            "log_type": "IN",
            "latitude": "0.000000",
            "longitude": "0.000000"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.create_checkin(&checkin_payload()).await.expect("pushed");
    assert_eq!(outcome, PushOutcome::Created);
}

#[tokio::test]
async fn duplicate_rejection_classifies_as_duplicate() {
    let server = MockServer::start().await;
    let server_messages =
        "[\"{\\\"message\\\": \\\"Employee HR-EMP-00001 already has a log at this time\\\"}\"]";
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(417).set_body_json(json!({
            "exception": "frappe.exceptions.ValidationError",
            "_server_messages": server_messages
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.create_checkin(&checkin_payload()).await.expect("classified");
    assert_eq!(outcome, PushOutcome::Duplicate);
}

#[tokio::test]
async fn unknown_employee_rejection_classifies_as_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "No Employee found for the given value"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.create_checkin(&checkin_payload()).await.expect("classified");
    assert_eq!(outcome, PushOutcome::UnknownEmployee);
}

#[tokio::test]
async fn unclassified_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.create_checkin(&checkin_payload()).await.expect_err("stays an error");
    assert!(matches!(err, BridgeError::Network(_)));
}

#[tokio::test]
async fn auth_failure_surfaces_as_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/resource/Employee"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "Not permitted"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.fetch_directory().await.expect_err("must fail");
    assert!(matches!(err, BridgeError::Auth(_)));
}

#[tokio::test]
async fn device_listing_accepts_the_message_wrapper() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/method/attendance_bridge.api.device.list_devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": [
                {
                    "device_id": "10.0.0.5:4370",
                    "device_name": "lobby",
                    "ip_address": "10.0.0.5",
                    "port": 4370,
                    "location": "front desk",
                    "is_active": true
                },
                {
                    "device_id": "10.0.0.9:4370",
                    "device_name": "dock",
                    "ip_address": "10.0.0.9",
                    "port": 4370,
                    "is_active": false
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let devices = client.list_active().await.expect("listed");

    // Inactive devices are filtered out client-side.
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_name, "lobby");
}

#[tokio::test]
async fn register_unwraps_the_method_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/method/attendance_bridge.api.device.register_device"))
        .and(body_partial_json(json!({
            "device_id": "10.0.0.5:4370",
            "device_name": "lobby",
            "ip_address": "10.0.0.5",
            "port": 4370
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {
                "device_id": "10.0.0.5:4370",
                "device_name": "lobby",
                "ip_address": "10.0.0.5",
                "port": 4370,
                "is_active": true
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let device = client
        .register(&NewTerminal::new("lobby", "10.0.0.5"))
        .await
        .expect("registered");
    assert_eq!(device.device_id, "10.0.0.5:4370");
    assert!(device.is_active);
}

#[tokio::test]
async fn disable_posts_the_remote_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/method/attendance_bridge.api.device.disable_device"))
        .and(body_partial_json(json!({ "device_id": "10.0.0.5:4370" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.disable("10.0.0.5:4370").await.expect("disabled");
}
