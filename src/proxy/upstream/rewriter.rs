// Rewrites designated function-response payloads inside agent events.
//
// Two rules, applied without disturbing anything else in the event:
//  - get_current_place: the runtime's server-side geolocation is replaced by
//    the coordinates the browser reported, when any are on record.
//  - show_place_details: successful responses that carry a location gain a
//    ui_action flag telling the frontend to render a map.

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::proxy::stores::LocationRecord;
use crate::proxy::upstream::correlator::CallCorrelator;

pub const CURRENT_PLACE_TOOL: &str = "get_current_place";
pub const PLACE_DETAILS_TOOL: &str = "show_place_details";
pub const UI_ACTION_SHOW_MAP: &str = "show_map";

/// Structural classification of one content part. The rewrite rules dispatch
/// on this instead of probing keys at every decision point; mutation still
/// goes through the original `Value` so unrecognized sibling fields survive.
#[derive(Debug, Clone, PartialEq)]
enum PartKind {
    FunctionCall { name: String, id: Option<String> },
    FunctionResponse { name: Option<String>, id: Option<String> },
    Text,
    Other,
}

fn classify_part(part: &Value) -> PartKind {
    if let Some(call) = part.get("functionCall") {
        return PartKind::FunctionCall {
            name: call
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            id: call.get("id").and_then(Value::as_str).map(str::to_string),
        };
    }
    if let Some(response) = part.get("functionResponse") {
        return PartKind::FunctionResponse {
            name: response.get("name").and_then(Value::as_str).map(str::to_string),
            id: response.get("id").and_then(Value::as_str).map(str::to_string),
        };
    }
    if part.get("text").is_some() {
        return PartKind::Text;
    }
    PartKind::Other
}

fn browser_location_response(location: &LocationRecord) -> Value {
    json!({
        "status": "success",
        "coordinates": {
            "lat": location.lat,
            "lng": location.lng
        },
        "accuracy": location.accuracy,
        "source": "browser"
    })
}

/// Add `ui_action: "show_map"` to a successful show_place_details response
/// that carries a location. Anything else is left untouched (worth a log
/// line, not an error). Idempotent.
fn augment_place_details(function_response: &mut Value) -> bool {
    let Some(response) = function_response.get_mut("response") else {
        warn!("show_place_details response part has no response object");
        return false;
    };

    let status = response.get("status").and_then(Value::as_str);
    let has_location = response.get("location").is_some_and(|l| !l.is_null());

    if status != Some("success") || !has_location {
        warn!(
            "Invalid show_place_details response: status={:?}, location present={}",
            status, has_location
        );
        return false;
    }

    response["ui_action"] = json!(UI_ACTION_SHOW_MAP);
    true
}

/// Apply both rewrite rules to one streamed event payload, driving the
/// correlator over its parts in order. Returns whether anything changed —
/// untouched events are relayed from their original bytes.
pub fn rewrite_event(
    payload: &mut Value,
    correlator: &mut CallCorrelator,
    browser: Option<&LocationRecord>,
) -> bool {
    let Some(parts) = payload
        .get_mut("content")
        .and_then(|c| c.get_mut("parts"))
        .and_then(Value::as_array_mut)
    else {
        return false;
    };

    let mut changed = false;

    for part in parts {
        match classify_part(part) {
            PartKind::FunctionCall { name, id } if name == CURRENT_PLACE_TOOL => {
                info!("Detected {} call with id {:?}", CURRENT_PLACE_TOOL, id);
                correlator.arm(id.as_deref());
            }
            PartKind::FunctionResponse { name, id } => {
                let Some(function_response) = part.get_mut("functionResponse") else {
                    continue;
                };
                if correlator.take_match(id.as_deref()) {
                    // The matched pair resolves either way; substitution only
                    // happens when the browser has actually reported a location.
                    if let Some(location) = browser {
                        function_response["response"] = browser_location_response(location);
                        info!("Replaced {} response with browser location", CURRENT_PLACE_TOOL);
                        changed = true;
                    }
                } else if name.as_deref() == Some(PLACE_DETAILS_TOOL)
                    && augment_place_details(function_response)
                {
                    info!("Enhanced {} response for UI rendering", PLACE_DETAILS_TOOL);
                    changed = true;
                }
            }
            _ => {}
        }
    }

    changed
}

/// Non-streaming variant: the same two rules over a fully-materialized event
/// list. Each event carries complete content here, so both rules match by
/// function-response name — no identifier correlation is needed. Returns the
/// number of rewritten parts.
pub fn rewrite_event_list(events: &mut Value, browser: Option<&LocationRecord>) -> usize {
    let Some(list) = events.as_array_mut() else {
        return 0;
    };

    let mut rewritten = 0;

    for event in list {
        let Some(parts) = event
            .get_mut("content")
            .and_then(|c| c.get_mut("parts"))
            .and_then(Value::as_array_mut)
        else {
            continue;
        };

        for part in parts {
            let PartKind::FunctionResponse { name, .. } = classify_part(part) else {
                continue;
            };
            let Some(function_response) = part.get_mut("functionResponse") else {
                continue;
            };

            match name.as_deref() {
                Some(CURRENT_PLACE_TOOL) => {
                    if let Some(location) = browser {
                        function_response["response"] = browser_location_response(location);
                        info!("Replaced {} response with browser location", CURRENT_PLACE_TOOL);
                        rewritten += 1;
                    }
                }
                Some(PLACE_DETAILS_TOOL) => {
                    if augment_place_details(function_response) {
                        rewritten += 1;
                    }
                }
                _ => {}
            }
        }
    }

    rewritten
}
