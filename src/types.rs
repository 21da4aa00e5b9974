use serde::{Deserialize, Serialize};

/// Who produced a turn in the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum TurnRole {
    User,
    Agent,
    Tool,
}

/// One entry in the append-only session history. Ordering is the timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ConversationTurn {
    pub(crate) role: TurnRole,
    pub(crate) content: String,
}

impl ConversationTurn {
    pub(crate) fn user(content: impl Into<String>) -> Self {
        ConversationTurn {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub(crate) fn agent(content: impl Into<String>) -> Self {
        ConversationTurn {
            role: TurnRole::Agent,
            content: content.into(),
        }
    }

    pub(crate) fn tool(content: impl Into<String>) -> Self {
        ConversationTurn {
            role: TurnRole::Tool,
            content: content.into(),
        }
    }
}

/// Calendar operations the agent may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CalendarOp {
    Create,
    Search,
    Update,
    Move,
    Delete,
    ListCalendars,
}

impl CalendarOp {
    pub(crate) fn from_tool_name(name: &str) -> Option<CalendarOp> {
        match name {
            "calendar_create" => Some(CalendarOp::Create),
            "calendar_search" => Some(CalendarOp::Search),
            "calendar_update" => Some(CalendarOp::Update),
            "calendar_move" => Some(CalendarOp::Move),
            "calendar_delete" => Some(CalendarOp::Delete),
            "calendar_list" => Some(CalendarOp::ListCalendars),
            _ => None,
        }
    }

    pub(crate) fn tool_name(&self) -> &'static str {
        match self {
            CalendarOp::Create => "calendar_create",
            CalendarOp::Search => "calendar_search",
            CalendarOp::Update => "calendar_update",
            CalendarOp::Move => "calendar_move",
            CalendarOp::Delete => "calendar_delete",
            CalendarOp::ListCalendars => "calendar_list",
        }
    }
}

/// Normalized shape of a calendar tool call before execution.
#[derive(Debug, Clone)]
pub(crate) struct CalendarIntent {
    pub(crate) op: CalendarOp,
    pub(crate) fields: serde_json::Value,
}

/// Result of one executed calendar operation.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToolExecution {
    pub(crate) output: String,
    pub(crate) details: serde_json::Value,
    pub(crate) is_error: bool,
}

/// A tool call the agent already carried out during a turn, with its result.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ExecutedIntent {
    pub(crate) tool: String,
    pub(crate) args: serde_json::Value,
    pub(crate) output: String,
    pub(crate) is_error: bool,
}

/// What the agent capability hands back to the session loop for one turn.
#[derive(Debug, Clone)]
pub(crate) struct TurnOutcome {
    pub(crate) reply: String,
    pub(crate) tool_calls: Vec<ExecutedIntent>,
}

/// A function call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FunctionCall {
    pub(crate) name: String,
    pub(crate) args: serde_json::Value,
}

/// One message in the model transcript. Roles: "user", "model", "tool".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub(crate) role: String,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default)]
    pub(crate) function_calls: Vec<FunctionCall>,
    #[serde(default)]
    pub(crate) function_name: Option<String>,
    #[serde(default)]
    pub(crate) function_response: Option<serde_json::Value>,
}

impl ChatMessage {
    pub(crate) fn user(text: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: Some(text.into()),
            function_calls: Vec::new(),
            function_name: None,
            function_response: None,
        }
    }

    pub(crate) fn tool_result(name: impl Into<String>, response: serde_json::Value) -> Self {
        ChatMessage {
            role: "tool".to_string(),
            content: None,
            function_calls: Vec::new(),
            function_name: Some(name.into()),
            function_response: Some(response),
        }
    }
}
