//! Filter-cycle scheduling arithmetic.
//!
//! The controller schedules filter cycles in 15-minute slots. Durations are
//! shown as `"2h"`, `"1h 15m"` or `"45m"`.

use chrono::NaiveTime;

use crate::types::Component;

pub const SLOT_MINUTES: u32 = 15;

/// Longest duration offered for a filter cycle, in slots (12 hours).
pub const MAX_CYCLE_SLOTS: u32 = 48;

/// Fallback when the controller reports something longer than [`MAX_CYCLE_SLOTS`] (2 hours).
pub const DEFAULT_CYCLE_SLOTS: u32 = 8;

pub const DEFAULT_DURATION_MINUTES: u32 = 120;

/// Whole slots in `minutes`, falling back to two hours beyond the 12 hour cap.
pub fn intervals_for_minutes(minutes: u32) -> u32 {
    let slots = minutes / SLOT_MINUTES;
    if slots > MAX_CYCLE_SLOTS {
        DEFAULT_CYCLE_SLOTS
    } else {
        slots
    }
}

pub fn minutes_to_label(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    match minutes % 60 {
        0 => format!("{hours}h"),
        rest => format!("{hours}h {rest}m"),
    }
}

/// Inverse of [`minutes_to_label`]. Returns `None` for anything unparseable.
pub fn label_to_minutes(label: &str) -> Option<u32> {
    let mut total = 0;
    let mut seen = false;
    for part in label.split_whitespace() {
        if let Some(h) = part.strip_suffix('h') {
            total += h.parse::<u32>().ok()? * 60;
        } else if let Some(m) = part.strip_suffix('m') {
            total += m.parse::<u32>().ok()?;
        } else {
            return None;
        }
        seen = true;
    }
    seen.then_some(total)
}

/// Durations offered for a cycle: every slot from 15 minutes up to the cap.
pub fn duration_options() -> Vec<String> {
    (1..=MAX_CYCLE_SLOTS)
        .map(|slot| minutes_to_label(slot * SLOT_MINUTES))
        .collect()
}

/// Start times offered for a cycle, every slot of the day as `HH:MM`.
pub fn time_options() -> Vec<String> {
    (0..24 * 60 / SLOT_MINUTES)
        .map(|slot| {
            let minutes = slot * SLOT_MINUTES;
            format!("{:02}:{:02}", minutes / 60, minutes % 60)
        })
        .collect()
}

/// Named schedule intervals as the vendor app labels them, `("idisabled", 0)` first,
/// then `i0hours15minutes` .. `i24hours`, numbered consecutively.
pub fn schedule_interval_table() -> Vec<(String, u32)> {
    let mut table = vec![("idisabled".to_string(), 0)];
    let mut index = 1;
    for hours in 0..=24u32 {
        for minutes in [0u32, 15, 30, 45] {
            if (hours == 0 && minutes == 0) || (hours == 24 && minutes > 0) {
                continue;
            }
            let plural = if hours == 1 { "" } else { "s" };
            let label = if minutes == 0 {
                format!("i{hours}hour{plural}")
            } else {
                format!("i{hours}hour{plural}{minutes}minutes")
            };
            table.push((label, index));
            index += 1;
        }
    }
    table
}

/// Start time of a filter component as reported by the dashboard.
pub fn start_time(component: &Component) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(component.hour.unwrap_or(0), component.minute.unwrap_or(0), 0)
}

/// Duration of a filter component, defaulting to two hours when unreported.
pub fn duration_minutes(component: &Component) -> u32 {
    component.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_capped() {
        assert_eq!(intervals_for_minutes(120), 8);
        assert_eq!(intervals_for_minutes(75), 5);
        assert_eq!(intervals_for_minutes(720), 48);
        assert_eq!(intervals_for_minutes(735), DEFAULT_CYCLE_SLOTS);
    }

    #[test]
    fn labels() {
        assert_eq!(minutes_to_label(45), "45m");
        assert_eq!(minutes_to_label(120), "2h");
        assert_eq!(minutes_to_label(75), "1h 15m");
        assert_eq!(label_to_minutes("1h 15m"), Some(75));
        assert_eq!(label_to_minutes("2h"), Some(120));
        assert_eq!(label_to_minutes("30m"), Some(30));
        assert_eq!(label_to_minutes(""), None);
        assert_eq!(label_to_minutes("soon"), None);
    }

    #[test]
    fn options() {
        let durations = duration_options();
        assert_eq!(durations.first().map(String::as_str), Some("15m"));
        assert_eq!(durations.last().map(String::as_str), Some("12h"));
        let times = time_options();
        assert_eq!(times.len(), 96);
        assert_eq!(times[1], "00:15");
        assert_eq!(times[95], "23:45");
    }

    #[test]
    fn interval_table() {
        let table = schedule_interval_table();
        assert_eq!(table[0], ("idisabled".to_string(), 0));
        assert_eq!(table[1], ("i0hours15minutes".to_string(), 1));
        assert!(table.contains(&("i1hour".to_string(), 4)));
        assert_eq!(table.last().unwrap(), &("i24hours".to_string(), 96));
    }

    #[test]
    fn component_schedule() {
        let filter = Component {
            hour: Some(20),
            minute: Some(30),
            ..Default::default()
        };
        assert_eq!(start_time(&filter), NaiveTime::from_hms_opt(20, 30, 0));
        assert_eq!(duration_minutes(&filter), 120);
    }
}
