use std::collections::HashMap;

use chrono::Utc;

use crate::{
    build_system_instructions, env_usize, tool_definitions_json, AgentCapability, CalendarClient,
    CalendarIntent, CalendarOp, ChatMessage, ConversationTurn, EffectiveConfig, ExecutedIntent,
    FunctionCall, GeminiClient, GeminiSettings, ToolExecution, TurnOutcome, UserProfile,
};

pub(crate) const MAX_STEPS_ENV_KEY: &str = "CLI_MAX_AGENT_STEPS";
pub(crate) const MAX_HISTORY_ENV_KEY: &str = "CLI_MAX_HISTORY_TURNS";

const DEFAULT_MAX_STEPS: usize = 16;
const DEFAULT_MAX_HISTORY: usize = 40;

/// The agent capability: owns the model transcript, the tool catalog, and
/// the calendar collaborator. The session loop sees only `invoke`.
pub(crate) struct GeminiAgent {
    client: GeminiClient,
    calendar: Option<CalendarClient>,
    env: HashMap<String, String>,
    system_instructions: String,
    timezone: String,
    tools: Vec<serde_json::Value>,
    transcript: Vec<ChatMessage>,
    max_steps: usize,
    max_history: usize,
}

impl GeminiAgent {
    pub(crate) fn new(
        config: &EffectiveConfig,
        env: &HashMap<String, String>,
        profile: Option<&UserProfile>,
        external_prompt: Option<&str>,
        max_steps_override: Option<usize>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let settings = GeminiSettings::from_env(env, &config.model_name)?;
        let max_steps = match max_steps_override {
            Some(steps) => steps,
            None => env_usize(env, MAX_STEPS_ENV_KEY, DEFAULT_MAX_STEPS)?,
        };
        let max_history = env_usize(env, MAX_HISTORY_ENV_KEY, DEFAULT_MAX_HISTORY)?;
        Ok(GeminiAgent {
            client: GeminiClient::new(settings),
            calendar: None,
            env: env.clone(),
            system_instructions: build_system_instructions(
                &config.timezone,
                profile,
                external_prompt,
                Utc::now(),
            ),
            timezone: config.timezone.clone(),
            tools: tool_definitions_json(),
            transcript: Vec::new(),
            max_steps: max_steps.max(1),
            max_history: max_history.max(2),
        })
    }

    fn execute_call(&mut self, call: &FunctionCall) -> ToolExecution {
        let Some(op) = CalendarOp::from_tool_name(&call.name) else {
            return ToolExecution {
                output: format!("Unknown tool: {}", call.name),
                details: serde_json::json!({}),
                is_error: true,
            };
        };
        if self.calendar.is_none() {
            match CalendarClient::from_env(&self.env) {
                Ok(client) => self.calendar = Some(client),
                Err(err) => {
                    return ToolExecution {
                        output: err.to_string(),
                        details: serde_json::json!({}),
                        is_error: true,
                    };
                }
            }
        }
        let Some(client) = self.calendar.as_ref() else {
            return ToolExecution {
                output: "calendar client unavailable".to_string(),
                details: serde_json::json!({}),
                is_error: true,
            };
        };
        let intent = CalendarIntent {
            op,
            fields: call.args.clone(),
        };
        match client.execute(&intent, &self.timezone) {
            Ok(result) => result,
            Err(err) => {
                eprintln!("[agent] {} failed: {err}", call.name);
                ToolExecution {
                    output: err.to_string(),
                    details: serde_json::json!({}),
                    is_error: true,
                }
            }
        }
    }
}

impl AgentCapability for GeminiAgent {
    /// One full tool-calling round: call the model, execute every requested
    /// calendar operation, feed results back, repeat until the model returns
    /// a plain reply. Tool failures go back to the model as error results;
    /// only model API failures raise out of here. The transcript is only
    /// committed on success so a failed turn leaves no partial state.
    fn invoke(
        &mut self,
        _history: &[ConversationTurn],
        user_text: &str,
    ) -> Result<TurnOutcome, Box<dyn std::error::Error>> {
        let mut pending = vec![ChatMessage::user(user_text)];
        let mut executed: Vec<ExecutedIntent> = Vec::new();

        for _ in 0..self.max_steps {
            let window = bounded_window(&self.transcript, &pending, self.max_history);
            let reply = self
                .client
                .generate(&self.system_instructions, &window, &self.tools)?;
            let calls = reply.function_calls.clone();
            let text = reply.content.clone();
            pending.push(reply);

            if calls.is_empty() {
                self.transcript.append(&mut pending);
                return Ok(TurnOutcome {
                    reply: text.unwrap_or_default(),
                    tool_calls: executed,
                });
            }

            for call in &calls {
                let result = self.execute_call(call);
                executed.push(ExecutedIntent {
                    tool: call.name.clone(),
                    args: call.args.clone(),
                    output: result.output.clone(),
                    is_error: result.is_error,
                });
                pending.push(ChatMessage::tool_result(
                    call.name.clone(),
                    serde_json::json!({
                        "output": result.output,
                        "details": result.details,
                        "is_error": result.is_error,
                    }),
                ));
            }
        }

        Err(format!(
            "agent stopped after {} steps without a final reply",
            self.max_steps
        )
        .into())
    }
}

/// Forward at most `max` trailing messages to the model. The window never
/// starts on a tool result, since a functionResponse without its matching
/// functionCall is rejected upstream.
pub(crate) fn bounded_window(
    transcript: &[ChatMessage],
    pending: &[ChatMessage],
    max: usize,
) -> Vec<ChatMessage> {
    let mut all: Vec<ChatMessage> = transcript.iter().chain(pending.iter()).cloned().collect();
    if all.len() > max {
        all.drain(..all.len() - max);
    }
    while all.first().map(|m| m.role == "tool").unwrap_or(false) {
        all.remove(0);
    }
    all
}
