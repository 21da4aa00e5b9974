use std::io::{BufRead, Write};

use crate::{ConversationTurn, TurnOutcome};

/// The collaborator that interprets a user line, performs whatever calendar
/// operations it decides on, and produces the reply for the turn.
pub(crate) trait AgentCapability {
    fn invoke(
        &mut self,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Result<TurnOutcome, Box<dyn std::error::Error>>;
}

pub(crate) const EXIT_SENTINELS: [&str; 3] = ["exit", "quit", "q"];

pub(crate) fn is_exit_command(line: &str) -> bool {
    let lower = line.trim().to_ascii_lowercase();
    EXIT_SENTINELS.contains(&lower.as_str())
}

/// Turn-based conversation loop. Reads one line per turn, short-circuits on
/// the exit sentinels, ignores blank lines, and otherwise hands the line to
/// the agent capability. A failed turn prints a one-line error and keeps the
/// loop alive; only the user turn of a failed attempt stays in history.
/// Returns the accumulated history when the session closes.
pub(crate) fn run_session<A: AgentCapability, R: BufRead, W: Write>(
    agent: &mut A,
    opening_prompt: Option<&str>,
    mut input: R,
    mut output: W,
) -> Result<Vec<ConversationTurn>, Box<dyn std::error::Error>> {
    let mut history: Vec<ConversationTurn> = Vec::new();

    if let Some(opening) = opening_prompt.map(str::trim).filter(|s| !s.is_empty()) {
        if is_exit_command(opening) {
            return Ok(history);
        }
        dispatch_turn(agent, &mut history, &mut output, opening)?;
    }

    loop {
        write!(output, "You (exit to quit)> ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break; // EOF closes the session like an exit sentinel
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(trimmed) {
            break;
        }
        dispatch_turn(agent, &mut history, &mut output, trimmed)?;
    }

    Ok(history)
}

fn dispatch_turn<A: AgentCapability, W: Write>(
    agent: &mut A,
    history: &mut Vec<ConversationTurn>,
    output: &mut W,
    user_text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    // The user turn is recorded before dispatch so a mid-turn failure still
    // leaves it in history.
    history.push(ConversationTurn::user(user_text));
    let prior = history.len() - 1;
    match agent.invoke(&history[..prior], user_text) {
        Ok(outcome) => {
            for call in &outcome.tool_calls {
                history.push(ConversationTurn::tool(format!(
                    "{}: {}",
                    call.tool, call.output
                )));
            }
            history.push(ConversationTurn::agent(outcome.reply.clone()));
            writeln!(output, "{}", outcome.reply)?;
        }
        Err(err) => {
            writeln!(output, "Error: {err}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExecutedIntent, TurnRole};
    use std::collections::VecDeque;
    use std::io::Cursor;

    struct ScriptedAgent {
        outcomes: VecDeque<Result<TurnOutcome, String>>,
        invocations: Vec<String>,
        history_sizes: Vec<usize>,
    }

    impl ScriptedAgent {
        fn new(outcomes: Vec<Result<TurnOutcome, String>>) -> Self {
            ScriptedAgent {
                outcomes: outcomes.into(),
                invocations: Vec::new(),
                history_sizes: Vec::new(),
            }
        }

        fn reply(text: &str) -> Result<TurnOutcome, String> {
            Ok(TurnOutcome {
                reply: text.to_string(),
                tool_calls: Vec::new(),
            })
        }
    }

    impl AgentCapability for ScriptedAgent {
        fn invoke(
            &mut self,
            history: &[ConversationTurn],
            user_text: &str,
        ) -> Result<TurnOutcome, Box<dyn std::error::Error>> {
            self.invocations.push(user_text.to_string());
            self.history_sizes.push(history.len());
            self.outcomes
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
                .map_err(|e| e.into())
        }
    }

    fn run(agent: &mut ScriptedAgent, input: &str) -> (Vec<ConversationTurn>, String) {
        let mut output = Vec::new();
        let history =
            run_session(agent, None, Cursor::new(input.to_string()), &mut output).unwrap();
        (history, String::from_utf8(output).unwrap())
    }

    #[test]
    fn exit_sentinel_terminates_without_agent_call() {
        let mut agent = ScriptedAgent::new(vec![]);
        let (history, _) = run(&mut agent, "exit\n");
        assert!(history.is_empty());
        assert!(agent.invocations.is_empty());
    }

    #[test]
    fn exit_sentinels_are_case_insensitive() {
        for sentinel in ["EXIT", "Quit", "q", "  Q  "] {
            let mut agent = ScriptedAgent::new(vec![]);
            let (history, _) = run(&mut agent, &format!("{sentinel}\n"));
            assert!(history.is_empty(), "{sentinel} should exit");
            assert!(agent.invocations.is_empty());
        }
    }

    #[test]
    fn blank_lines_are_ignored() {
        let mut agent = ScriptedAgent::new(vec![ScriptedAgent::reply("ok")]);
        let (history, _) = run(&mut agent, "\n   \nhello\nexit\n");
        assert_eq!(agent.invocations, vec!["hello"]);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn successful_turn_appends_user_then_agent_and_prints_reply() {
        let mut agent = ScriptedAgent::new(vec![Ok(TurnOutcome {
            reply: "Done — lunch added at 12:00".to_string(),
            tool_calls: vec![ExecutedIntent {
                tool: "calendar_create".to_string(),
                args: serde_json::json!({"summary": "Lunch"}),
                output: "Calendar event created.".to_string(),
                is_error: false,
            }],
        })]);
        let (history, output) = run(&mut agent, "Schedule lunch at noon tomorrow\nexit\n");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[0].content, "Schedule lunch at noon tomorrow");
        assert_eq!(history[1].role, TurnRole::Tool);
        assert!(history[1].content.contains("calendar_create"));
        assert_eq!(history[2].role, TurnRole::Agent);
        assert_eq!(history[2].content, "Done — lunch added at 12:00");
        assert!(output.contains("Done — lunch added at 12:00"));
    }

    #[test]
    fn failed_turn_keeps_user_turn_and_loop_continues() {
        let mut agent = ScriptedAgent::new(vec![
            Err("upstream API failure".to_string()),
            ScriptedAgent::reply("recovered"),
        ]);
        let (history, output) = run(&mut agent, "first\nsecond\nexit\n");
        assert_eq!(agent.invocations, vec!["first", "second"]);
        // First attempt: user turn only. Second: user + agent.
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1].role, TurnRole::User);
        assert_eq!(history[2].role, TurnRole::Agent);
        assert!(output.contains("Error: upstream API failure"));
        assert!(output.contains("recovered"));
    }

    #[test]
    fn agent_sees_history_up_to_but_not_including_current_line() {
        let mut agent = ScriptedAgent::new(vec![
            ScriptedAgent::reply("one"),
            ScriptedAgent::reply("two"),
        ]);
        let (_, _) = run(&mut agent, "a\nb\nexit\n");
        // First call: empty history. Second: user + agent turn from turn one.
        assert_eq!(agent.history_sizes, vec![0, 2]);
    }

    #[test]
    fn eof_closes_the_session() {
        let mut agent = ScriptedAgent::new(vec![ScriptedAgent::reply("ok")]);
        let (history, _) = run(&mut agent, "hello\n");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn opening_prompt_is_dispatched_before_reading_input() {
        let mut agent = ScriptedAgent::new(vec![ScriptedAgent::reply("hi there")]);
        let mut output = Vec::new();
        let history = run_session(
            &mut agent,
            Some("hello"),
            Cursor::new("exit\n".to_string()),
            &mut output,
        )
        .unwrap();
        assert_eq!(agent.invocations, vec!["hello"]);
        assert_eq!(history.len(), 2);
    }
}
