#![allow(dead_code)]

use std::time::Duration;

use control_my_spa::SpaClient;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SPA_ID: &str = "spa-1";
pub const TOKEN: &str = "abc123";

pub fn dashboard_data() -> Value {
    json!({
        "desiredTemp": "100.0",
        "currentTemp": 98,
        "isPanelLocked": false,
        "heaterMode": "READY",
        "tempRange": "HIGH",
        "rangeLimits": {
            "highRangeLow": 80,
            "highRangeHigh": 104,
            "lowRangeLow": 50,
            "lowRangeHigh": 99
        },
        "time": "14:05",
        "serialNumber": "2101234",
        "systemInfo": { "controllerSoftwareVersion": "M100_225 V43.0" },
        "isOnline": true,
        "primaryTZLStatus": "TZL_NOT_PRESENT",
        "components": [
            {"componentType": "PUMP", "port": "0", "value": "OFF", "availableValues": ["OFF", "HIGH"]},
            {"componentType": "LIGHT", "port": "0", "value": "OFF", "availableValues": ["OFF", "HIGH"]},
            {"componentType": "FILTER", "port": "0", "value": "OFF", "hour": 8, "minute": 0, "durationMinutes": 120}
        ]
    })
}

pub fn dashboard_body() -> Value {
    json!({ "data": dashboard_data() })
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"accessToken": TOKEN}})))
        .mount(server)
        .await;
}

pub async fn mount_dashboard(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/spas/{SPA_ID}/dashboard")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub fn client_for(server: &MockServer, settle: Duration) -> SpaClient {
    SpaClient::builder("user@example.com", "secret")
        .base_url(server.uri())
        .spa_id(SPA_ID)
        .settle_delay(settle)
        .build()
        .expect("client should build")
}

pub async fn count_requests(server: &MockServer, method_name: &str, path_suffix: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == method_name && r.url.path().ends_with(path_suffix))
        .count()
}
