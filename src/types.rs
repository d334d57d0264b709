use std::fmt;

use serde_json::{Map, Value};

/// Temperature stored in Fahrenheit, the unit the spa controller reports.
/// Celsius is derived at the edge, rounded to 0.1 like the vendor app shows it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_fahrenheit(f: f64) -> Self {
        Self(f)
    }

    pub fn from_celsius(c: f64) -> Self {
        Self(c * (9.0 / 5.0) + 32.0)
    }

    pub fn fahrenheit(&self) -> f64 {
        self.0
    }

    pub fn celsius(&self) -> f64 {
        (self.0 - 32.0) * (5.0 / 9.0)
    }

    /// Celsius rounded to one decimal.
    pub fn display_celsius(&self) -> f64 {
        (self.celsius() * 10.0).round() / 10.0
    }

    /// Fahrenheit rounded to one decimal, as sent in setpoint commands.
    pub fn to_vendor_fahrenheit(&self) -> f64 {
        (self.0 * 10.0).round() / 10.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0}F", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaterMode {
    Ready,
    Rest,
    ReadyInRest,
    ReadyRest,
}

impl HeaterMode {
    pub fn as_vendor_str(&self) -> &'static str {
        match self {
            HeaterMode::Ready => "READY",
            HeaterMode::Rest => "REST",
            HeaterMode::ReadyInRest => "READY_IN_REST",
            HeaterMode::ReadyRest => "READY_REST",
        }
    }

    pub fn from_vendor_str(s: &str) -> Option<Self> {
        match s {
            "READY" => Some(HeaterMode::Ready),
            "REST" => Some(HeaterMode::Rest),
            "READY_IN_REST" => Some(HeaterMode::ReadyInRest),
            "READY_REST" => Some(HeaterMode::ReadyRest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempRange {
    High,
    Low,
}

impl TempRange {
    pub fn as_vendor_str(&self) -> &'static str {
        match self {
            TempRange::High => "HIGH",
            TempRange::Low => "LOW",
        }
    }

    pub fn from_vendor_str(s: &str) -> Option<Self> {
        match s {
            "HIGH" => Some(TempRange::High),
            "LOW" => Some(TempRange::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Pump,
    Blower,
    Light,
    CirculationPump,
    Filter,
    Ozone,
    Heater,
    Other(String),
}

impl ComponentType {
    pub fn as_vendor_str(&self) -> &str {
        match self {
            ComponentType::Pump => "PUMP",
            ComponentType::Blower => "BLOWER",
            ComponentType::Light => "LIGHT",
            ComponentType::CirculationPump => "CIRCULATION_PUMP",
            ComponentType::Filter => "FILTER",
            ComponentType::Ozone => "OZONE",
            ComponentType::Heater => "HEATER",
            ComponentType::Other(s) => s,
        }
    }

    pub fn from_vendor_str(s: &str) -> Self {
        match s {
            "PUMP" => ComponentType::Pump,
            "BLOWER" => ComponentType::Blower,
            "LIGHT" => ComponentType::Light,
            "CIRCULATION_PUMP" => ComponentType::CirculationPump,
            "FILTER" => ComponentType::Filter,
            "OZONE" => ComponentType::Ozone,
            "HEATER" => ComponentType::Heater,
            other => ComponentType::Other(other.to_string()),
        }
    }
}

/// Speed levels the vendor uses for pumps and blowers, lowest first.
pub const SPEED_LEVELS: &[&str] = &["OFF", "LOW", "MED", "HIGH"];

/// A physical sub-device of the spa, identified by type and port.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Component {
    pub component_type: ComponentType,
    pub port: Option<String>,
    pub value: Option<String>,
    pub available_values: Vec<String>,
    pub name: Option<String>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub duration_minutes: Option<u32>,
    /// Vendor fields with no dedicated slot, kept verbatim.
    pub extra: Map<String, Value>,
}

impl Default for ComponentType {
    fn default() -> Self {
        ComponentType::Other(String::new())
    }
}

impl Component {
    pub fn supports(&self, value: &str) -> bool {
        self.available_values.iter().any(|v| v == value)
    }

    /// Port as a device number for component-state commands.
    pub fn device_number(&self) -> Option<u32> {
        self.port.as_deref().and_then(|p| p.parse().ok())
    }

    /// Next legal speed above the current one, or the current value when already at the top.
    pub fn next_higher_value(&self) -> Option<String> {
        let current = self.value.as_deref().unwrap_or("OFF");
        let current_rank = SPEED_LEVELS.iter().position(|l| *l == current);
        let next = SPEED_LEVELS
            .iter()
            .enumerate()
            .filter(|(rank, _)| current_rank.is_none_or(|c| *rank > c))
            .map(|(_, level)| *level)
            .find(|level| self.supports(level));
        next.or(self.value.as_deref()).map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetupParams {
    pub high_range_low: Temperature,
    pub high_range_high: Temperature,
    pub low_range_low: Temperature,
    pub low_range_high: Temperature,
}

impl SetupParams {
    /// Legal setpoint bounds for the given range.
    pub fn bounds(&self, range: TempRange) -> (Temperature, Temperature) {
        match range {
            TempRange::High => (self.high_range_low, self.high_range_high),
            TempRange::Low => (self.low_range_low, self.low_range_high),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TzlZone {
    pub zone_id: u32,
    pub zone_name: String,
    pub state: String,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub intensity: u32,
    pub speed: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TzlColor {
    pub color_id: u32,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub is_secondary: bool,
}

impl TzlColor {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

/// Canonical snapshot of the spa built from one dashboard read.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaState {
    pub desired_temp: Temperature,
    pub target_desired_temp: Temperature,
    /// `None` until the controller has reported a reading.
    pub current_temp: Option<Temperature>,
    pub panel_lock: bool,
    pub heater_mode: HeaterMode,
    pub run_mode: HeaterMode,
    pub temp_range: TempRange,
    pub components: Vec<Component>,
    pub setup_params: SetupParams,
    pub time: String,
    pub is_military_time: Option<bool>,
    pub serial_number: String,
    pub controller_software_version: String,
    pub is_online: bool,
    pub tzl_zones: Vec<TzlZone>,
    pub tzl_zone_functions: Vec<Value>,
    pub tzl_colors: Vec<TzlColor>,
}

impl SpaState {
    pub fn component(&self, component_type: &ComponentType, port: Option<&str>) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| &c.component_type == component_type && c.port.as_deref() == port)
    }

    pub fn components_of<'a>(
        &'a self,
        component_type: &'a ComponentType,
    ) -> impl Iterator<Item = &'a Component> + 'a {
        self.components
            .iter()
            .filter(move |c| &c.component_type == component_type)
    }

    pub fn count_of(&self, component_type: &ComponentType) -> usize {
        self.components_of(component_type).count()
    }

    pub fn tzl_zone(&self, zone_id: u32) -> Option<&TzlZone> {
        self.tzl_zones.iter().find(|z| z.zone_id == zone_id)
    }

    pub fn has_tzl(&self) -> bool {
        !self.tzl_zones.is_empty()
    }
}

/// One spa owned by the account, as listed for device selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaSummary {
    pub id: String,
    pub serial_number: Option<String>,
    pub alias: Option<String>,
}

impl SpaSummary {
    pub fn label(&self) -> String {
        match (&self.serial_number, &self.alias) {
            (Some(sn), Some(alias)) if !alias.is_empty() => format!("{sn} {alias}"),
            (Some(sn), _) => sn.clone(),
            (None, Some(alias)) => alias.clone(),
            (None, None) => self.id.clone(),
        }
    }
}

/// Events emitted by the diff engine when the cached state changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CurrentTempChanged { temp: Option<Temperature> },
    DesiredTempChanged { temp: Temperature },
    HeaterModeChanged { mode: HeaterMode },
    TempRangeChanged { range: TempRange },
    PanelLockChanged { locked: bool },
    OnlineChanged { online: bool },
    ComponentChanged { component_type: ComponentType, port: Option<String>, value: Option<String> },
    ComponentAdded { component_type: ComponentType, port: Option<String> },
    ComponentRemoved { component_type: ComponentType, port: Option<String> },
    TzlZoneChanged { zone_id: u32, state: String, red: u8, green: u8, blue: u8 },
    StateLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pump(value: &str, available: &[&str]) -> Component {
        Component {
            component_type: ComponentType::Pump,
            port: Some("0".into()),
            value: Some(value.into()),
            available_values: available.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn next_value_two_speed() {
        let p = pump("OFF", &["OFF", "HIGH"]);
        assert_eq!(p.next_higher_value().as_deref(), Some("HIGH"));
        let p = pump("HIGH", &["OFF", "HIGH"]);
        assert_eq!(p.next_higher_value().as_deref(), Some("HIGH"));
    }

    #[test]
    fn next_value_three_speed() {
        let p = pump("LOW", &["OFF", "LOW", "MED", "HIGH"]);
        assert_eq!(p.next_higher_value().as_deref(), Some("MED"));
        let p = pump("OFF", &["OFF", "LOW", "HIGH"]);
        assert_eq!(p.next_higher_value().as_deref(), Some("LOW"));
    }

    #[test]
    fn component_type_passthrough() {
        assert_eq!(ComponentType::from_vendor_str("CIRCULATION_PUMP"), ComponentType::CirculationPump);
        let other = ComponentType::from_vendor_str("MISTER");
        assert_eq!(other.as_vendor_str(), "MISTER");
    }

    #[test]
    fn spa_label() {
        let spa = SpaSummary {
            id: "abc".into(),
            serial_number: Some("SN1".into()),
            alias: Some("Garden".into()),
        };
        assert_eq!(spa.label(), "SN1 Garden");
    }

    #[test]
    fn color_hex() {
        let c = TzlColor { color_id: 1, red: 255, green: 0, blue: 16, is_secondary: false };
        assert_eq!(c.hex(), "#ff0010");
    }
}
