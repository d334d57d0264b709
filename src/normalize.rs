//! Mapping from the vendor dashboard payload to [`SpaState`].
//!
//! The payload shape is not contractually stable, so every required field is
//! looked up explicitly and a single missing one discards the whole record.

use serde_json::Value;

use crate::types::*;
use crate::{Error, Result};

pub const TZL_CONNECTED: &str = "TZL_CONNECTED";

/// Build a complete [`SpaState`] from the `data` object of a dashboard response.
pub fn normalize(data: &Value) -> Result<SpaState> {
    if !data.is_object() {
        return Err(Error::Parse("dashboard data is not an object".to_string()));
    }

    let desired = number(data, "/desiredTemp")?;
    let current = number(data, "/currentTemp")?;

    let heater_mode_str = string(data, "/heaterMode")?;
    let heater_mode = HeaterMode::from_vendor_str(heater_mode_str)
        .ok_or_else(|| Error::Parse(format!("unknown heaterMode {heater_mode_str:?}")))?;

    let range_str = string(data, "/tempRange")?;
    let temp_range = TempRange::from_vendor_str(range_str)
        .ok_or_else(|| Error::Parse(format!("unknown tempRange {range_str:?}")))?;

    let setup_params = SetupParams {
        high_range_low: Temperature::from_fahrenheit(number(data, "/rangeLimits/highRangeLow")?),
        high_range_high: Temperature::from_fahrenheit(number(data, "/rangeLimits/highRangeHigh")?),
        low_range_low: Temperature::from_fahrenheit(number(data, "/rangeLimits/lowRangeLow")?),
        low_range_high: Temperature::from_fahrenheit(number(data, "/rangeLimits/lowRangeHigh")?),
    };

    let components = match data.get("components") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(component).collect::<Result<_>>()?,
        Some(_) => return Err(Error::Parse("components is not an array".to_string())),
    };

    let tzl_connected = data.get("primaryTZLStatus").and_then(|v| v.as_str()) == Some(TZL_CONNECTED);
    let (tzl_zones, tzl_zone_functions, tzl_colors) = if tzl_connected {
        (
            array(data, "tzlZones").iter().map(tzl_zone).collect::<Result<_>>()?,
            array(data, "tzlZoneFunctions").to_vec(),
            array(data, "tzlColors").iter().map(tzl_color).collect::<Result<_>>()?,
        )
    } else {
        (Vec::new(), Vec::new(), Vec::new())
    };

    Ok(SpaState {
        desired_temp: Temperature::from_fahrenheit(desired),
        target_desired_temp: Temperature::from_fahrenheit(desired),
        current_temp: (current != 0.0).then(|| Temperature::from_fahrenheit(current)),
        panel_lock: boolean(data, "/isPanelLocked")?,
        heater_mode,
        run_mode: heater_mode,
        temp_range,
        components,
        setup_params,
        time: string(data, "/time")?.to_string(),
        is_military_time: data.get("isMilitaryTime").and_then(|v| v.as_bool()),
        serial_number: text(required(data, "/serialNumber")?, "/serialNumber")?,
        controller_software_version: text(
            required(data, "/systemInfo/controllerSoftwareVersion")?,
            "/systemInfo/controllerSoftwareVersion",
        )?,
        is_online: truthy(data.get("isOnline")),
        tzl_zones,
        tzl_zone_functions,
        tzl_colors,
    })
}

fn component(raw: &Value) -> Result<Component> {
    let obj = raw
        .as_object()
        .ok_or_else(|| Error::Parse("component is not an object".to_string()))?;
    let component_type = ComponentType::from_vendor_str(string(raw, "/componentType")?);

    let mut extra = obj.clone();
    for key in [
        "componentType",
        "port",
        "value",
        "availableValues",
        "name",
        "hour",
        "minute",
        "durationMinutes",
    ] {
        extra.remove(key);
    }

    Ok(Component {
        component_type,
        port: raw.get("port").and_then(scalar_text),
        value: raw.get("value").and_then(scalar_text),
        available_values: raw
            .get("availableValues")
            .and_then(|v| v.as_array())
            .map(|vals| vals.iter().filter_map(scalar_text).collect())
            .unwrap_or_default(),
        name: raw.get("name").and_then(|v| v.as_str()).map(str::to_string),
        hour: raw.get("hour").and_then(as_u32),
        minute: raw.get("minute").and_then(as_u32),
        duration_minutes: raw.get("durationMinutes").and_then(as_u32),
        extra,
    })
}

fn tzl_zone(raw: &Value) -> Result<TzlZone> {
    Ok(TzlZone {
        zone_id: required(raw, "/zoneId").and_then(|v| as_u32(v).ok_or_else(|| bad("/zoneId")))?,
        zone_name: raw.get("zoneName").and_then(scalar_text).unwrap_or_default(),
        state: raw.get("state").and_then(scalar_text).unwrap_or_default(),
        red: channel(raw, "red"),
        green: channel(raw, "green"),
        blue: channel(raw, "blue"),
        intensity: raw.get("intensity").and_then(as_u32).unwrap_or(0),
        speed: raw.get("speed").and_then(as_u32).unwrap_or(0),
    })
}

fn tzl_color(raw: &Value) -> Result<TzlColor> {
    Ok(TzlColor {
        color_id: required(raw, "/colorId").and_then(|v| as_u32(v).ok_or_else(|| bad("/colorId")))?,
        red: channel(raw, "red"),
        green: channel(raw, "green"),
        blue: channel(raw, "blue"),
        is_secondary: truthy(raw.get("isSecondary")),
    })
}

fn required<'a>(data: &'a Value, path: &str) -> Result<&'a Value> {
    match data.pointer(path) {
        Some(Value::Null) | None => Err(Error::Parse(format!("missing field {path}"))),
        Some(v) => Ok(v),
    }
}

fn bad(path: &str) -> Error {
    Error::Parse(format!("unexpected type at {path}"))
}

/// Numbers arrive either as JSON numbers or as numeric strings.
fn number(data: &Value, path: &str) -> Result<f64> {
    let v = required(data, path)?;
    match v {
        Value::Number(n) => n.as_f64().ok_or_else(|| bad(path)),
        Value::String(s) => s.trim().parse().map_err(|_| bad(path)),
        _ => Err(bad(path)),
    }
}

fn string<'a>(data: &'a Value, path: &str) -> Result<&'a str> {
    required(data, path)?.as_str().ok_or_else(|| bad(path))
}

fn boolean(data: &Value, path: &str) -> Result<bool> {
    required(data, path)?.as_bool().ok_or_else(|| bad(path))
}

fn text(v: &Value, path: &str) -> Result<String> {
    scalar_text(v).ok_or_else(|| bad(path))
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_u32(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn channel(raw: &Value, key: &str) -> u8 {
    raw.get(key)
        .and_then(as_u32)
        .map(|c| c.min(255) as u8)
        .unwrap_or(0)
}

fn array<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(|v| v.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dashboard() -> Value {
        json!({
            "desiredTemp": "100",
            "currentTemp": 98.5,
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
            "isMilitaryTime": true,
            "serialNumber": "2101234",
            "systemInfo": { "controllerSoftwareVersion": "M100_225 V43.0" },
            "isOnline": true,
            "components": [
                {"componentType": "PUMP", "port": "0", "value": "OFF", "availableValues": ["OFF", "HIGH"]},
                {"componentType": "PUMP", "port": 1, "value": "LOW", "availableValues": ["OFF", "LOW", "HIGH"]},
                {"componentType": "FILTER", "port": "0", "value": "OFF", "hour": 8, "minute": 30, "durationMinutes": 120},
                {"componentType": "HEATER", "port": "0", "value": "ON", "materialType": "HEATER"}
            ],
            "primaryTZLStatus": "TZL_NOT_PRESENT",
            "tzlZones": [{"zoneId": 1, "state": "PARTY"}],
            "tzlColors": [{"colorId": 1}],
            "tzlZoneFunctions": ["PARTY"]
        })
    }

    #[test]
    fn complete_payload() {
        let state = normalize(&dashboard()).unwrap();
        assert_eq!(state.desired_temp.fahrenheit(), 100.0);
        assert_eq!(state.target_desired_temp, state.desired_temp);
        assert_eq!(state.current_temp.unwrap().fahrenheit(), 98.5);
        assert_eq!(state.heater_mode, HeaterMode::Ready);
        assert_eq!(state.run_mode, HeaterMode::Ready);
        assert_eq!(state.temp_range, TempRange::High);
        assert_eq!(state.setup_params.low_range_high.fahrenheit(), 99.0);
        assert_eq!(state.serial_number, "2101234");
        assert_eq!(state.controller_software_version, "M100_225 V43.0");
        assert!(state.is_online);
        assert_eq!(state.is_military_time, Some(true));
        assert_eq!(state.components.len(), 4);
    }

    #[test]
    fn ports_normalized_to_strings() {
        let state = normalize(&dashboard()).unwrap();
        let pump = state.component(&ComponentType::Pump, Some("1")).unwrap();
        assert_eq!(pump.value.as_deref(), Some("LOW"));
        assert_eq!(pump.device_number(), Some(1));
        let filter = state.component(&ComponentType::Filter, Some("0")).unwrap();
        assert_eq!(filter.hour, Some(8));
        assert_eq!(filter.duration_minutes, Some(120));
        let heater = state.component(&ComponentType::Heater, Some("0")).unwrap();
        assert_eq!(heater.extra["materialType"], "HEATER");
    }

    #[test]
    fn zero_current_temp_is_absent() {
        let mut raw = dashboard();
        raw["currentTemp"] = json!(0);
        let state = normalize(&raw).unwrap();
        assert!(state.current_temp.is_none());
    }

    #[test]
    fn missing_range_limits_discards_record() {
        let mut raw = dashboard();
        raw.as_object_mut().unwrap().remove("rangeLimits");
        let err = normalize(&raw).unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.contains("rangeLimits")), "{err}");
    }

    #[test]
    fn missing_nested_field_discards_record() {
        let mut raw = dashboard();
        raw["systemInfo"] = json!({});
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn unknown_heater_mode_rejected() {
        let mut raw = dashboard();
        raw["heaterMode"] = json!("TURBO");
        assert!(normalize(&raw).is_err());
    }

    #[test]
    fn tzl_ignored_unless_connected() {
        let state = normalize(&dashboard()).unwrap();
        assert!(state.tzl_zones.is_empty());
        assert!(state.tzl_zone_functions.is_empty());
        assert!(state.tzl_colors.is_empty());
    }

    #[test]
    fn tzl_mapped_when_connected() {
        let mut raw = dashboard();
        raw["primaryTZLStatus"] = json!("TZL_CONNECTED");
        raw["tzlZones"] = json!([{
            "zoneId": 2, "zoneName": "Main", "state": "NORMAL",
            "red": 10, "green": 20, "blue": 300, "intensity": 5, "speed": 2
        }]);
        raw["tzlColors"] = json!([{"colorId": 4, "red": 1, "green": 2, "blue": 3, "isSecondary": true}]);
        let state = normalize(&raw).unwrap();
        let zone = state.tzl_zone(2).unwrap();
        assert_eq!(zone.zone_name, "Main");
        assert_eq!(zone.blue, 255);
        assert_eq!(zone.intensity, 5);
        assert!(state.tzl_colors[0].is_secondary);
        assert_eq!(state.tzl_zone_functions, vec![json!("PARTY")]);
    }

    #[test]
    fn tzl_connected_without_lists_defaults_empty() {
        let mut raw = dashboard();
        raw["primaryTZLStatus"] = json!("TZL_CONNECTED");
        let obj = raw.as_object_mut().unwrap();
        obj.remove("tzlZones");
        obj.remove("tzlColors");
        obj.remove("tzlZoneFunctions");
        let state = normalize(&raw).unwrap();
        assert!(!state.has_tzl());
    }

    #[test]
    fn missing_components_defaults_empty() {
        let mut raw = dashboard();
        raw.as_object_mut().unwrap().remove("components");
        assert!(normalize(&raw).unwrap().components.is_empty());
    }

    #[test]
    fn non_object_rejected() {
        assert!(normalize(&Value::Null).is_err());
    }
}
