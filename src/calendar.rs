use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    env_optional, env_u64, CalendarIntent, CalendarOp, CreateEventArgs, DeleteEventArgs,
    MoveEventArgs, SearchEventsArgs, ToolExecution, UpdateEventArgs,
};

pub(crate) const TOKEN_ENV_KEY: &str = "GOOGLE_OAUTH_TOKEN";
pub(crate) const TOKEN_FILE_ENV_KEY: &str = "GOOGLE_TOKEN_FILE";
pub(crate) const DEFAULT_TOKEN_FILE: &str = "token.json";

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Executes calendar operations against the Google Calendar v3 REST API
/// with a previously obtained OAuth access token. Token exchange and
/// refresh are out of scope; we only read what the auth flow stored.
pub(crate) struct CalendarClient {
    token: String,
    timeout: Duration,
}

/// Access token precedence: GOOGLE_OAUTH_TOKEN, then the toolkit-style
/// token file (GOOGLE_TOKEN_FILE or ./token.json, `access_token`/`token`
/// field). Absence is an auth error with a remediation hint.
pub(crate) fn resolve_access_token(
    env: &HashMap<String, String>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(token) = env_optional(env, TOKEN_ENV_KEY) {
        return Ok(token);
    }
    let path = env_optional(env, TOKEN_FILE_ENV_KEY)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));
    if let Ok(data) = fs::read_to_string(&path) {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&data) {
            let token = parsed
                .get("access_token")
                .or_else(|| parsed.get("token"))
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            if let Some(token) = token {
                return Ok(token);
            }
        }
    }
    Err(format!(
        "No Google Calendar access token. Set {TOKEN_ENV_KEY} or place a token file at {}.",
        path.display()
    )
    .into())
}

fn calendar_path(calendar_id: Option<&str>) -> String {
    let id = calendar_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("primary");
    urlencoding::encode(id).into_owned()
}

fn datetime_value(datetime: &str, timezone: Option<&str>, default_tz: &str) -> serde_json::Value {
    let tz = timezone
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default_tz);
    serde_json::json!({ "dateTime": datetime, "timeZone": tz })
}

pub(crate) fn create_event_payload(args: &CreateEventArgs, default_tz: &str) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert("summary".to_string(), serde_json::json!(args.summary));
    body.insert(
        "start".to_string(),
        datetime_value(&args.start_datetime, args.timezone.as_deref(), default_tz),
    );
    body.insert(
        "end".to_string(),
        datetime_value(&args.end_datetime, args.timezone.as_deref(), default_tz),
    );
    if let Some(location) = &args.location {
        body.insert("location".to_string(), serde_json::json!(location));
    }
    if let Some(description) = &args.description {
        body.insert("description".to_string(), serde_json::json!(description));
    }
    if let Some(color_id) = &args.color_id {
        body.insert("colorId".to_string(), serde_json::json!(color_id));
    }
    serde_json::Value::Object(body)
}

pub(crate) fn update_event_payload(args: &UpdateEventArgs, default_tz: &str) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    if let Some(summary) = &args.summary {
        body.insert("summary".to_string(), serde_json::json!(summary));
    }
    if let Some(start) = &args.start_datetime {
        body.insert(
            "start".to_string(),
            datetime_value(start, args.timezone.as_deref(), default_tz),
        );
    }
    if let Some(end) = &args.end_datetime {
        body.insert(
            "end".to_string(),
            datetime_value(end, args.timezone.as_deref(), default_tz),
        );
    }
    if let Some(location) = &args.location {
        body.insert("location".to_string(), serde_json::json!(location));
    }
    if let Some(description) = &args.description {
        body.insert("description".to_string(), serde_json::json!(description));
    }
    if let Some(color_id) = &args.color_id {
        body.insert("colorId".to_string(), serde_json::json!(color_id));
    }
    serde_json::Value::Object(body)
}

pub(crate) fn search_events_url(args: &SearchEventsArgs) -> String {
    let mut url = format!(
        "{CALENDAR_API_BASE}/calendars/{}/events?singleEvents=true&orderBy=startTime&maxResults={}",
        calendar_path(args.calendar_id.as_deref()),
        args.max_results.unwrap_or(10)
    );
    if let Some(query) = args.query.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        url.push_str(&format!("&q={}", urlencoding::encode(query)));
    }
    if let Some(time_min) = &args.time_min {
        url.push_str(&format!("&timeMin={}", urlencoding::encode(time_min)));
    }
    if let Some(time_max) = &args.time_max {
        url.push_str(&format!("&timeMax={}", urlencoding::encode(time_max)));
    }
    url
}

fn event_url(calendar_id: Option<&str>, event_id: &str) -> String {
    format!(
        "{CALENDAR_API_BASE}/calendars/{}/events/{}",
        calendar_path(calendar_id),
        urlencoding::encode(event_id)
    )
}

impl CalendarClient {
    pub(crate) fn from_env(
        env: &HashMap<String, String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let token = resolve_access_token(env)?;
        let timeout = env_u64(env, "CALENDAR_HTTP_TIMEOUT", DEFAULT_TIMEOUT_SECS)?;
        Ok(CalendarClient {
            token,
            timeout: Duration::from_secs(timeout),
        })
    }

    fn agent(&self) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout_connect(self.timeout)
            .timeout_read(self.timeout)
            .timeout_write(self.timeout)
            .build()
    }

    fn send(
        &self,
        op_name: &str,
        request: ureq::Request,
        payload: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        let request = request.set("authorization", &format!("Bearer {}", self.token));
        let response = match payload {
            Some(payload) => request
                .set("content-type", "application/json")
                .send_json(payload),
            None => request.call(),
        };
        match response {
            Ok(resp) => {
                // DELETE returns 204 with an empty body.
                if resp.status() == 204 {
                    return Ok(serde_json::json!({}));
                }
                let text = resp.into_string()?;
                if text.trim().is_empty() {
                    return Ok(serde_json::json!({}));
                }
                Ok(serde_json::from_str(&text)?)
            }
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                Err(format!("{op_name} error {code}: {text}").into())
            }
            Err(err) => Err(format!("{op_name} failed: {err}").into()),
        }
    }

    /// Execute one normalized calendar intent. `default_timezone` is the
    /// session's effective timezone, applied when a call does not override.
    pub(crate) fn execute(
        &self,
        intent: &CalendarIntent,
        default_timezone: &str,
    ) -> Result<ToolExecution, Box<dyn std::error::Error>> {
        let op_name = intent.op.tool_name();
        let args = intent.fields.clone();
        match intent.op {
            CalendarOp::Create => {
                let parsed: CreateEventArgs =
                    serde_json::from_value(args).map_err(|e| format!("args: {e}"))?;
                let url = format!(
                    "{CALENDAR_API_BASE}/calendars/{}/events",
                    calendar_path(parsed.calendar_id.as_deref())
                );
                let payload = create_event_payload(&parsed, default_timezone);
                let details = self.send(op_name, self.agent().post(&url), Some(payload))?;
                Ok(ToolExecution {
                    output: "Calendar event created.".to_string(),
                    details,
                    is_error: false,
                })
            }
            CalendarOp::Search => {
                let parsed: SearchEventsArgs =
                    serde_json::from_value(args).map_err(|e| format!("args: {e}"))?;
                let url = search_events_url(&parsed);
                let details = self.send(op_name, self.agent().get(&url), None)?;
                let count = details
                    .get("items")
                    .and_then(|v| v.as_array())
                    .map(|a| a.len())
                    .unwrap_or(0);
                Ok(ToolExecution {
                    output: format!("Found {count} events."),
                    details,
                    is_error: false,
                })
            }
            CalendarOp::Update => {
                let parsed: UpdateEventArgs =
                    serde_json::from_value(args).map_err(|e| format!("args: {e}"))?;
                let url = event_url(parsed.calendar_id.as_deref(), &parsed.event_id);
                let payload = update_event_payload(&parsed, default_timezone);
                let details =
                    self.send(op_name, self.agent().request("PATCH", &url), Some(payload))?;
                Ok(ToolExecution {
                    output: "Calendar event updated.".to_string(),
                    details,
                    is_error: false,
                })
            }
            CalendarOp::Move => {
                let parsed: MoveEventArgs =
                    serde_json::from_value(args).map_err(|e| format!("args: {e}"))?;
                let url = format!(
                    "{}/move?destination={}",
                    event_url(parsed.calendar_id.as_deref(), &parsed.event_id),
                    urlencoding::encode(&parsed.destination_calendar_id)
                );
                let details = self.send(op_name, self.agent().post(&url), None)?;
                Ok(ToolExecution {
                    output: "Calendar event moved.".to_string(),
                    details,
                    is_error: false,
                })
            }
            CalendarOp::Delete => {
                let parsed: DeleteEventArgs =
                    serde_json::from_value(args).map_err(|e| format!("args: {e}"))?;
                let url = event_url(parsed.calendar_id.as_deref(), &parsed.event_id);
                let details = self.send(op_name, self.agent().delete(&url), None)?;
                Ok(ToolExecution {
                    output: "Calendar event deleted.".to_string(),
                    details,
                    is_error: false,
                })
            }
            CalendarOp::ListCalendars => {
                let url = format!("{CALENDAR_API_BASE}/users/me/calendarList");
                let details = self.send(op_name, self.agent().get(&url), None)?;
                let count = details
                    .get("items")
                    .and_then(|v| v.as_array())
                    .map(|a| a.len())
                    .unwrap_or(0);
                Ok(ToolExecution {
                    output: format!("Listed {count} calendars."),
                    details,
                    is_error: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn token_env_var_takes_precedence() {
        let dir = std::env::temp_dir().join("tempo_test");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join(format!("token_{}.json", std::process::id()));
        std::fs::write(&file, r#"{"access_token":"from-file"}"#).unwrap();
        let env = env_with(&[
            (TOKEN_ENV_KEY, "from-env"),
            (TOKEN_FILE_ENV_KEY, file.to_str().unwrap()),
        ]);
        assert_eq!(resolve_access_token(&env).unwrap(), "from-env");
        let env = env_with(&[(TOKEN_FILE_ENV_KEY, file.to_str().unwrap())]);
        assert_eq!(resolve_access_token(&env).unwrap(), "from-file");
        std::fs::remove_file(&file).ok();
    }

    #[test]
    fn missing_token_is_an_error_with_hint() {
        let env = env_with(&[(TOKEN_FILE_ENV_KEY, "/nonexistent/token.json")]);
        let err = resolve_access_token(&env).unwrap_err().to_string();
        assert!(err.contains(TOKEN_ENV_KEY));
    }

    #[test]
    fn create_payload_applies_default_timezone() {
        let args: CreateEventArgs = serde_json::from_value(serde_json::json!({
            "summary": "Standup",
            "start_datetime": "2025-06-02T10:00:00",
            "end_datetime": "2025-06-02T10:30:00",
            "color_id": "2"
        }))
        .unwrap();
        let payload = create_event_payload(&args, "Europe/Istanbul");
        assert_eq!(
            payload.pointer("/start/timeZone").and_then(|v| v.as_str()),
            Some("Europe/Istanbul")
        );
        assert_eq!(
            payload.pointer("/colorId").and_then(|v| v.as_str()),
            Some("2")
        );
        assert!(payload.get("location").is_none());
    }

    #[test]
    fn create_payload_honors_timezone_override() {
        let args: CreateEventArgs = serde_json::from_value(serde_json::json!({
            "summary": "Call",
            "start_datetime": "2025-06-02T10:00:00",
            "end_datetime": "2025-06-02T11:00:00",
            "timezone": "Asia/Tokyo"
        }))
        .unwrap();
        let payload = create_event_payload(&args, "Etc/UTC");
        assert_eq!(
            payload.pointer("/end/timeZone").and_then(|v| v.as_str()),
            Some("Asia/Tokyo")
        );
    }

    #[test]
    fn update_payload_only_carries_given_fields() {
        let args: UpdateEventArgs = serde_json::from_value(serde_json::json!({
            "event_id": "abc",
            "summary": "Renamed"
        }))
        .unwrap();
        let payload = update_event_payload(&args, "Etc/UTC");
        assert_eq!(
            payload.get("summary").and_then(|v| v.as_str()),
            Some("Renamed")
        );
        assert!(payload.get("start").is_none());
        assert!(payload.get("end").is_none());
    }

    #[test]
    fn search_url_encodes_parameters() {
        let args: SearchEventsArgs = serde_json::from_value(serde_json::json!({
            "query": "team lunch",
            "time_min": "2025-06-01T00:00:00+03:00",
            "max_results": 5
        }))
        .unwrap();
        let url = search_events_url(&args);
        assert!(url.contains("/calendars/primary/events?"));
        assert!(url.contains("maxResults=5"));
        assert!(url.contains("q=team%20lunch"));
        assert!(url.contains("timeMin=2025-06-01T00%3A00%3A00%2B03%3A00"));
        assert!(!url.contains("timeMax="));
    }

    #[test]
    fn calendar_ids_are_encoded_into_paths() {
        let url = event_url(Some("team@example.com"), "evt 1");
        assert!(url.contains("/calendars/team%40example.com/events/evt%201"));
        assert!(event_url(None, "x").contains("/calendars/primary/events/x"));
    }
}
