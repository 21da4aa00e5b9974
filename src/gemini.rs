use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use serde_json;

use crate::{
    env_f64, env_optional, env_u64, env_usize, jitter_ratio, parse_retry_after, ChatMessage,
    FunctionCall, API_KEY_ENV_KEY,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Client knobs, resolved once from the startup env snapshot. The API key
/// is allowed to be absent here; it only becomes an error when a request
/// is actually attempted, so key-less commands keep working.
#[derive(Debug, Clone)]
pub(crate) struct GeminiSettings {
    pub(crate) api_key: Option<String>,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) max_tokens: u64,
    pub(crate) temperature: Option<f64>,
    pub(crate) timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) retry_base: f64,
    pub(crate) retry_max: f64,
}

impl GeminiSettings {
    pub(crate) fn from_env(
        env: &HashMap<String, String>,
        model: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let temperature = match env_optional(env, "GEMINI_TEMPERATURE") {
            Some(_) => Some(env_f64(env, "GEMINI_TEMPERATURE", 0.0)?),
            None => None,
        };
        Ok(GeminiSettings {
            api_key: env_optional(env, API_KEY_ENV_KEY),
            model: model.to_string(),
            base_url: env_optional(env, "GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_tokens: env_u64(env, "GEMINI_MAX_TOKENS", 8192)?,
            temperature,
            timeout: Duration::from_secs(env_u64(env, "GEMINI_TIMEOUT", 120)?),
            max_retries: env_usize(env, "GEMINI_MAX_RETRIES", 2)?,
            retry_base: env_f64(env, "GEMINI_RETRY_BASE", 0.5)?,
            retry_max: env_f64(env, "GEMINI_RETRY_MAX", 4.0)?,
        })
    }
}

pub(crate) struct GeminiClient {
    settings: GeminiSettings,
}

/// Map the transcript into Gemini `contents`. Function results travel back
/// under the user role as functionResponse parts, mirroring how the API
/// expects tool round trips.
pub(crate) fn to_gemini_contents(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    for msg in messages {
        match msg.role.as_str() {
            "user" => {
                let text = msg.content.clone().unwrap_or_default();
                out.push(serde_json::json!({
                    "role": "user",
                    "parts": [{ "text": text }]
                }));
            }
            "model" => {
                let mut parts = Vec::new();
                if let Some(content) = &msg.content {
                    if !content.is_empty() {
                        parts.push(serde_json::json!({ "text": content }));
                    }
                }
                for call in &msg.function_calls {
                    parts.push(serde_json::json!({
                        "functionCall": { "name": call.name, "args": call.args }
                    }));
                }
                if parts.is_empty() {
                    parts.push(serde_json::json!({ "text": "" }));
                }
                out.push(serde_json::json!({ "role": "model", "parts": parts }));
            }
            "tool" => {
                let Some(name) = msg.function_name.clone() else {
                    continue;
                };
                let response = msg
                    .function_response
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({}));
                out.push(serde_json::json!({
                    "role": "user",
                    "parts": [{
                        "functionResponse": { "name": name, "response": response }
                    }]
                }));
            }
            _ => {}
        }
    }
    out
}

pub(crate) fn to_function_declarations(tools: &[serde_json::Value]) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    for tool in tools {
        let Some(obj) = tool.as_object() else {
            continue;
        };
        let Some(name) = obj.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        let mut entry = serde_json::Map::new();
        entry.insert("name".to_string(), serde_json::json!(name));
        if let Some(desc) = obj.get("description").and_then(|v| v.as_str()) {
            entry.insert("description".to_string(), serde_json::json!(desc));
        }
        if let Some(params) = obj.get("parameters") {
            entry.insert("parameters".to_string(), params.clone());
        }
        out.push(serde_json::Value::Object(entry));
    }
    out
}

/// Statuses worth retrying: rate limiting and transient upstream failures.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

pub(crate) fn parse_gemini_response(
    payload: &serde_json::Value,
) -> Result<ChatMessage, Box<dyn std::error::Error>> {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .and_then(|v| v.as_array())
        .ok_or("Gemini response missing candidates")?;

    let mut text_parts = Vec::new();
    let mut function_calls = Vec::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
            if !text.is_empty() {
                text_parts.push(text.to_string());
            }
        }
        if let Some(call) = part.get("functionCall") {
            let name = call
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let args = call.get("args").cloned().unwrap_or(serde_json::json!({}));
            function_calls.push(FunctionCall { name, args });
        }
    }

    let content = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join("\n"))
    };

    Ok(ChatMessage {
        role: "model".to_string(),
        content,
        function_calls,
        function_name: None,
        function_response: None,
    })
}

impl GeminiClient {
    pub(crate) fn new(settings: GeminiSettings) -> Self {
        GeminiClient { settings }
    }

    /// One generateContent round trip with retry on 429/5xx and transport
    /// errors: exponential backoff with jitter, honoring retry-after.
    pub(crate) fn generate(
        &self,
        system_instructions: &str,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> Result<ChatMessage, Box<dyn std::error::Error>> {
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            format!(
                "{API_KEY_ENV_KEY} not set. Set it in your environment or in a .env file \
                 (tempo configure-google)."
            )
        })?;

        let mut payload = serde_json::json!({
            "contents": to_gemini_contents(messages),
            "system_instruction": { "parts": [{ "text": system_instructions }] },
            "generationConfig": { "maxOutputTokens": self.settings.max_tokens },
        });
        if let Some(temp) = self.settings.temperature {
            payload["generationConfig"]["temperature"] = serde_json::json!(temp);
        }
        let declarations = to_function_declarations(tools);
        if !declarations.is_empty() {
            payload["tools"] = serde_json::json!([{ "function_declarations": declarations }]);
        }

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.settings.base_url, self.settings.model, api_key
        );
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(self.settings.timeout)
            .timeout_read(self.settings.timeout)
            .timeout_write(self.settings.timeout)
            .build();

        let max_retries = self.settings.max_retries;
        let mut body = None;

        for attempt in 0..=max_retries {
            let request = agent.post(&url).set("content-type", "application/json");
            match request.send_json(payload.clone()) {
                Ok(resp) => {
                    body = Some(resp.into_string()?);
                    break;
                }
                Err(ureq::Error::Status(code, resp)) => {
                    let retry_after = parse_retry_after(&resp);
                    let text = resp.into_string().unwrap_or_default();
                    if attempt < max_retries && is_retryable_status(code) {
                        let mut delay = (self.settings.retry_base * 2.0_f64.powi(attempt as i32))
                            .min(self.settings.retry_max);
                        if let Some(retry_after) = retry_after {
                            delay = delay.max(retry_after);
                        }
                        delay *= 1.0 + jitter_ratio() * 0.2;
                        thread::sleep(Duration::from_secs_f64(delay));
                        continue;
                    }
                    return Err(format!("gemini error {code}: {text}").into());
                }
                Err(ureq::Error::Transport(err)) => {
                    if attempt < max_retries {
                        let mut delay = (self.settings.retry_base * 2.0_f64.powi(attempt as i32))
                            .min(self.settings.retry_max);
                        delay *= 1.0 + jitter_ratio() * 0.2;
                        thread::sleep(Duration::from_secs_f64(delay));
                        continue;
                    }
                    return Err(format!("gemini transport error: {err}").into());
                }
            }
        }

        let body = body.ok_or("gemini request produced no response")?;
        let parsed: serde_json::Value = serde_json::from_str(&body)?;
        parse_gemini_response(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_map_user_and_model_roles() {
        let messages = vec![
            ChatMessage::user("hello"),
            ChatMessage {
                role: "model".to_string(),
                content: Some("hi".to_string()),
                function_calls: vec![FunctionCall {
                    name: "calendar_search".to_string(),
                    args: serde_json::json!({"query": "lunch"}),
                }],
                function_name: None,
                function_response: None,
            },
        ];
        let contents = to_gemini_contents(&messages);
        assert_eq!(contents.len(), 2);
        assert_eq!(
            contents[0].pointer("/parts/0/text").and_then(|v| v.as_str()),
            Some("hello")
        );
        assert_eq!(
            contents[1]
                .pointer("/parts/1/functionCall/name")
                .and_then(|v| v.as_str()),
            Some("calendar_search")
        );
    }

    #[test]
    fn tool_results_become_function_responses_under_user_role() {
        let messages = vec![ChatMessage::tool_result(
            "calendar_create",
            serde_json::json!({"output": "Calendar event created."}),
        )];
        let contents = to_gemini_contents(&messages);
        assert_eq!(
            contents[0].get("role").and_then(|v| v.as_str()),
            Some("user")
        );
        assert_eq!(
            contents[0]
                .pointer("/parts/0/functionResponse/name")
                .and_then(|v| v.as_str()),
            Some("calendar_create")
        );
    }

    #[test]
    fn tool_message_without_name_is_skipped() {
        let messages = vec![ChatMessage {
            role: "tool".to_string(),
            content: None,
            function_calls: Vec::new(),
            function_name: None,
            function_response: Some(serde_json::json!({})),
        }];
        assert!(to_gemini_contents(&messages).is_empty());
    }

    #[test]
    fn declarations_keep_name_description_parameters() {
        let tools = vec![serde_json::json!({
            "name": "calendar_delete",
            "description": "Delete an event.",
            "parameters": { "type": "object", "properties": {} },
            "extra": "dropped"
        })];
        let decls = to_function_declarations(&tools);
        assert_eq!(decls.len(), 1);
        assert_eq!(
            decls[0].get("name").and_then(|v| v.as_str()),
            Some("calendar_delete")
        );
        assert!(decls[0].get("parameters").is_some());
        assert!(decls[0].get("extra").is_none());
    }

    #[test]
    fn parse_extracts_text_and_function_calls() {
        let payload = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Checking your calendar." },
                        { "functionCall": {
                            "name": "calendar_search",
                            "args": { "query": "standup" }
                        }}
                    ]
                }
            }]
        });
        let msg = parse_gemini_response(&payload).unwrap();
        assert_eq!(msg.content.as_deref(), Some("Checking your calendar."));
        assert_eq!(msg.function_calls.len(), 1);
        assert_eq!(msg.function_calls[0].name, "calendar_search");
    }

    #[test]
    fn retryable_statuses_cover_rate_limits_and_transient_5xx() {
        for code in [429u16, 500, 502, 503, 504] {
            assert!(is_retryable_status(code), "{code} should be retryable");
        }
        for code in [200u16, 400, 401, 403, 404, 501] {
            assert!(!is_retryable_status(code), "{code} should not be retryable");
        }
    }

    #[test]
    fn parse_rejects_missing_candidates() {
        let payload = serde_json::json!({ "promptFeedback": {} });
        assert!(parse_gemini_response(&payload).is_err());
    }

    #[test]
    fn settings_defaults_and_overrides() {
        let env: HashMap<String, String> = [
            ("GEMINI_MAX_RETRIES".to_string(), "5".to_string()),
            ("GEMINI_TEMPERATURE".to_string(), "0.3".to_string()),
        ]
        .into_iter()
        .collect();
        let settings = GeminiSettings::from_env(&env, "gemini-2.5-flash").unwrap();
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.temperature, Some(0.3));
        assert_eq!(settings.max_tokens, 8192);
        assert!(settings.api_key.is_none());
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }
}
