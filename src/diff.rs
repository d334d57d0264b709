use serde_json::Value;

use crate::types::*;

/// Collect `(path, old, new)` for every leaf that differs between two JSON trees.
/// Paths are dot-separated; array elements are addressed by index.
pub(crate) fn diff_json(
    previous: &Value,
    current: &Value,
    path_prefix: &str,
    changes: &mut Vec<(String, Value, Value)>,
) {
    match (previous, current) {
        (Value::Object(prev_map), Value::Object(curr_map)) => {
            for (key, curr_val) in curr_map {
                let path = join(path_prefix, key);
                match prev_map.get(key) {
                    Some(prev_val) => diff_json(prev_val, curr_val, &path, changes),
                    None => {
                        if curr_val.is_object() {
                            diff_json(&Value::Object(serde_json::Map::new()), curr_val, &path, changes);
                        } else {
                            changes.push((path, Value::Null, curr_val.clone()));
                        }
                    }
                }
            }
        }
        (Value::Array(prev_arr), Value::Array(curr_arr)) if prev_arr.len() == curr_arr.len() => {
            for (i, (prev_val, curr_val)) in prev_arr.iter().zip(curr_arr).enumerate() {
                diff_json(prev_val, curr_val, &join(path_prefix, &i.to_string()), changes);
            }
        }
        (prev, curr) if prev != curr => {
            changes.push((path_prefix.to_string(), prev.clone(), curr.clone()));
        }
        _ => {}
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Typed events describing what changed between two consecutive cached states.
pub(crate) fn state_events(previous: Option<&SpaState>, current: Option<&SpaState>) -> Vec<Event> {
    let mut events = Vec::new();

    let current = match (previous, current) {
        (_, Some(c)) => c,
        (Some(_), None) => {
            events.push(Event::StateLost);
            return events;
        }
        (None, None) => return events,
    };

    let prev = match previous {
        Some(p) => p,
        None => {
            // First state: announce everything once.
            events.push(Event::CurrentTempChanged { temp: current.current_temp });
            events.push(Event::DesiredTempChanged { temp: current.desired_temp });
            events.push(Event::HeaterModeChanged { mode: current.heater_mode });
            events.push(Event::TempRangeChanged { range: current.temp_range });
            events.push(Event::PanelLockChanged { locked: current.panel_lock });
            events.push(Event::OnlineChanged { online: current.is_online });
            for c in &current.components {
                events.push(Event::ComponentAdded {
                    component_type: c.component_type.clone(),
                    port: c.port.clone(),
                });
            }
            return events;
        }
    };

    if prev.current_temp != current.current_temp {
        events.push(Event::CurrentTempChanged { temp: current.current_temp });
    }
    if prev.desired_temp != current.desired_temp {
        events.push(Event::DesiredTempChanged { temp: current.desired_temp });
    }
    if prev.heater_mode != current.heater_mode {
        events.push(Event::HeaterModeChanged { mode: current.heater_mode });
    }
    if prev.temp_range != current.temp_range {
        events.push(Event::TempRangeChanged { range: current.temp_range });
    }
    if prev.panel_lock != current.panel_lock {
        events.push(Event::PanelLockChanged { locked: current.panel_lock });
    }
    if prev.is_online != current.is_online {
        events.push(Event::OnlineChanged { online: current.is_online });
    }

    for c in &current.components {
        match prev.component(&c.component_type, c.port.as_deref()) {
            Some(old) if old.value != c.value => events.push(Event::ComponentChanged {
                component_type: c.component_type.clone(),
                port: c.port.clone(),
                value: c.value.clone(),
            }),
            Some(_) => {}
            None => events.push(Event::ComponentAdded {
                component_type: c.component_type.clone(),
                port: c.port.clone(),
            }),
        }
    }
    for old in &prev.components {
        if current.component(&old.component_type, old.port.as_deref()).is_none() {
            events.push(Event::ComponentRemoved {
                component_type: old.component_type.clone(),
                port: old.port.clone(),
            });
        }
    }

    for zone in &current.tzl_zones {
        let changed = match prev.tzl_zone(zone.zone_id) {
            Some(old) => {
                old.state != zone.state
                    || (old.red, old.green, old.blue) != (zone.red, zone.green, zone.blue)
            }
            None => true,
        };
        if changed {
            events.push(Event::TzlZoneChanged {
                zone_id: zone.zone_id,
                state: zone.state.clone(),
                red: zone.red,
                green: zone.green,
                blue: zone.blue,
            });
        }
    }

    events
}
