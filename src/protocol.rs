use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};

use crate::types::SpaSummary;

pub const DEFAULT_BASE_URL: &str = "https://iot.controlmyspa.com";

/// Every command is tagged as coming from the mobile app.
pub const VIA: &str = "MOBILE";

pub const USER_AGENT: &str = "cms/34 CFNetwork/3826.500.111.2.2 Darwin/24.4.0";
pub const ACCEPT: &str = "*/*";
pub const ACCEPT_LANGUAGE: &str = "en-GB,en;q=0.9";

pub const LOGIN_PATH: &str = "/auth/login";
pub const PROFILE_PATH: &str = "/user-management/profile";
pub const OWNED_SPAS_PATH: &str = "/spas/owned";

pub const TEMPERATURE_VALUE_PATH: &str = "/spa-commands/temperature/value";
pub const TEMPERATURE_RANGE_PATH: &str = "/spa-commands/temperature/range";
pub const HEATER_MODE_PATH: &str = "/spa-commands/temperature/heater-mode";
pub const PANEL_STATE_PATH: &str = "/spa-commands/panel/state";
pub const COMPONENT_STATE_PATH: &str = "/spa-commands/component-state";
pub const FILTER_SCHEDULE_PATH: &str = "/spa-commands/filter-cycles/schedule";
pub const TIME_PATH: &str = "/spa-commands/time";
// Chromazone (TZL) paths follow the naming of the other command endpoints.
// They have not been confirmed against the live API.
pub const TZL_FUNCTION_PATH: &str = "/spa-commands/chromazone/function";
pub const TZL_COLOR_PATH: &str = "/spa-commands/chromazone/color";
pub const TZL_BRIGHTNESS_PATH: &str = "/spa-commands/chromazone/brightness";
pub const TZL_SPEED_PATH: &str = "/spa-commands/chromazone/speed";

pub fn dashboard_path(spa_id: &str) -> String {
    format!("/spas/{spa_id}/dashboard")
}

pub fn login_body(email: &str, password: &str) -> Value {
    json!({ "email": email, "password": password })
}

pub fn temperature_data(spa_id: &str, value_f: f64) -> Value {
    json!({ "spaId": spa_id, "via": VIA, "value": value_f })
}

pub fn temperature_range_data(spa_id: &str, high: bool) -> Value {
    json!({
        "spaId": spa_id,
        "via": VIA,
        "range": if high { "HIGH" } else { "LOW" }
    })
}

pub fn heater_mode_data(spa_id: &str, mode: &str) -> Value {
    json!({ "spaId": spa_id, "via": VIA, "mode": mode })
}

pub fn panel_lock_data(spa_id: &str, locked: bool) -> Value {
    json!({
        "spaId": spa_id,
        "via": VIA,
        "state": if locked { "LOCK_PANEL" } else { "UNLOCK_PANEL" }
    })
}

pub fn component_state_data(spa_id: &str, device_number: u32, state: &str, component_type: &str) -> Value {
    json!({
        "deviceNumber": device_number,
        "state": state,
        "spaId": spa_id,
        "via": VIA,
        "componentType": component_type
    })
}

pub fn filter_schedule_data(spa_id: &str, device_number: u32, intervals: u32, start: NaiveTime) -> Value {
    json!({
        "spaId": spa_id,
        "via": VIA,
        "deviceNumber": device_number,
        "numOfIntervals": intervals,
        "time": start.format("%H:%M").to_string()
    })
}

pub fn time_data(spa_id: &str, date: NaiveDate, time: NaiveTime, military: bool) -> Value {
    json!({
        "spaId": spa_id,
        "via": VIA,
        "date": date.format("%Y-%m-%d").to_string(),
        "time": time.format("%H:%M").to_string(),
        "isMilitaryFormat": military
    })
}

pub fn tzl_data(spa_id: &str, zone_id: u32, field: &str, value: Value) -> Value {
    let mut data = json!({ "spaId": spa_id, "via": VIA, "zoneId": zone_id });
    data[field] = value;
    data
}

pub fn parse_access_token(body: &Value) -> Option<String> {
    body.pointer("/data/accessToken")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn parse_profile(body: &Value) -> Option<Value> {
    body.pointer("/data/user").filter(|u| !u.is_null()).cloned()
}

pub fn parse_owned_spas(body: &Value) -> Vec<SpaSummary> {
    let spas = match body.pointer("/data/spas") {
        Some(Value::Array(spas)) => spas,
        _ => return vec![],
    };
    spas.iter()
        .filter_map(|spa| {
            let id = spa
                .get("_id")
                .or_else(|| spa.get("id"))
                .and_then(|v| v.as_str())?
                .to_string();
            Some(SpaSummary {
                id,
                serial_number: spa.get("serialNumber").and_then(|v| v.as_str()).map(str::to_string),
                alias: spa.get("alias").and_then(|v| v.as_str()).map(str::to_string),
            })
        })
        .collect()
}
