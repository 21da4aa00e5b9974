use serde_json;

/// Calendar tool catalog handed to the model as function declarations.
/// Datetimes are RFC3339 without offset (e.g. "2025-06-01T10:00:00"); the
/// effective timezone is applied server-side unless a call overrides it.
pub(crate) fn tool_definitions_json() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({
            "name": "calendar_create",
            "description": "Create a Google Calendar event.",
            "parameters": {
                "type": "object",
                "properties": {
                    "summary": { "type": "string", "description": "Event title" },
                    "start_datetime": { "type": "string", "description": "Start, e.g. 2025-06-01T10:00:00" },
                    "end_datetime": { "type": "string", "description": "End, e.g. 2025-06-01T10:30:00" },
                    "timezone": { "type": "string", "description": "IANA timezone override" },
                    "location": { "type": "string" },
                    "description": { "type": "string" },
                    "color_id": { "type": "string", "description": "Google Calendar color id (1-11)" },
                    "calendar_id": { "type": "string", "description": "Defaults to primary" }
                },
                "required": ["summary", "start_datetime", "end_datetime"]
            }
        }),
        serde_json::json!({
            "name": "calendar_search",
            "description": "Search Google Calendar events by text and/or time window.",
            "parameters": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Free-text match" },
                    "time_min": { "type": "string", "description": "Window start, RFC3339" },
                    "time_max": { "type": "string", "description": "Window end, RFC3339" },
                    "max_results": { "type": "integer" },
                    "calendar_id": { "type": "string", "description": "Defaults to primary" }
                }
            }
        }),
        serde_json::json!({
            "name": "calendar_update",
            "description": "Update fields of an existing event.",
            "parameters": {
                "type": "object",
                "properties": {
                    "event_id": { "type": "string" },
                    "summary": { "type": "string" },
                    "start_datetime": { "type": "string" },
                    "end_datetime": { "type": "string" },
                    "timezone": { "type": "string" },
                    "location": { "type": "string" },
                    "description": { "type": "string" },
                    "color_id": { "type": "string" },
                    "calendar_id": { "type": "string", "description": "Defaults to primary" }
                },
                "required": ["event_id"]
            }
        }),
        serde_json::json!({
            "name": "calendar_move",
            "description": "Move an event to another calendar.",
            "parameters": {
                "type": "object",
                "properties": {
                    "event_id": { "type": "string" },
                    "destination_calendar_id": { "type": "string" },
                    "calendar_id": { "type": "string", "description": "Source, defaults to primary" }
                },
                "required": ["event_id", "destination_calendar_id"]
            }
        }),
        serde_json::json!({
            "name": "calendar_delete",
            "description": "Delete an event. Irreversible; confirm with the user first.",
            "parameters": {
                "type": "object",
                "properties": {
                    "event_id": { "type": "string" },
                    "calendar_id": { "type": "string", "description": "Defaults to primary" }
                },
                "required": ["event_id"]
            }
        }),
        serde_json::json!({
            "name": "calendar_list",
            "description": "List the calendars the user can access.",
            "parameters": {
                "type": "object",
                "properties": {}
            }
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CalendarOp;

    #[test]
    fn every_tool_maps_to_an_operation() {
        let names: Vec<String> = tool_definitions_json()
            .iter()
            .filter_map(|tool| tool.get("name").and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names.len(), 6);
        for name in &names {
            assert!(
                CalendarOp::from_tool_name(name).is_some(),
                "{name} has no operation"
            );
        }
    }

    #[test]
    fn declarations_carry_schemas() {
        for tool in tool_definitions_json() {
            assert!(tool.get("description").is_some());
            assert_eq!(
                tool.pointer("/parameters/type").and_then(|v| v.as_str()),
                Some("object")
            );
        }
    }
}
