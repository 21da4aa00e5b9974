// Module declarations
mod cli;
mod types;
mod tool_args;
mod util;
mod profile;
mod config;
mod prompt;
mod env_file;
mod tool_defs;
mod calendar;
mod gemini;
mod session;
mod agent;

// Re-export all module items at crate root so cross-module references work
// through a single shared namespace.
#[allow(unused_imports)]
pub(crate) use cli::*;
#[allow(unused_imports)]
pub(crate) use types::*;
#[allow(unused_imports)]
pub(crate) use tool_args::*;
#[allow(unused_imports)]
pub(crate) use util::*;
#[allow(unused_imports)]
pub(crate) use profile::*;
#[allow(unused_imports)]
pub(crate) use config::*;
#[allow(unused_imports)]
pub(crate) use prompt::*;
#[allow(unused_imports)]
pub(crate) use env_file::*;
#[allow(unused_imports)]
pub(crate) use tool_defs::*;
#[allow(unused_imports)]
pub(crate) use calendar::*;
#[allow(unused_imports)]
pub(crate) use gemini::*;
#[allow(unused_imports)]
pub(crate) use session::*;
#[allow(unused_imports)]
pub(crate) use agent::*;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use clap::Parser;

const ENV_FILE: &str = ".env";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional; a missing file is the common case.
    let _ = dotenvy::dotenv();
    let env = env_snapshot();
    let cli = Cli::parse();

    match cli.command {
        Command::Chat {
            prompt,
            timezone,
            profile,
            max_steps,
        } => cmd_chat(
            &env,
            prompt.as_deref(),
            timezone.as_deref(),
            profile.as_deref(),
            max_steps,
        ),
        Command::QuickCreate {
            summary,
            start,
            end,
            timezone,
            location,
            description,
            color_id,
            calendar_id,
            profile,
        } => cmd_quick_create(
            &env,
            QuickCreateRequest {
                summary,
                start,
                end,
                timezone,
                location,
                description,
                color_id,
                calendar_id,
                profile,
            },
        ),
        Command::ListCalendars => cmd_list_calendars(&env),
        Command::Tools => cmd_tools(),
        Command::EnvInfo => cmd_env_info(&env),
        Command::InitProfile { path } => {
            let target = path.unwrap_or_else(|| default_profile_path(&env));
            let written = write_default_profile_template(&target)?;
            println!("Profile ready at {}", written.display());
            Ok(())
        }
        Command::ShowProfile { path } => cmd_show_profile(&env, path.as_deref()),
        Command::InitSystemPrompt { path } => {
            let target = path.unwrap_or_else(|| default_system_prompt_path(&env));
            let written = write_default_system_prompt_template(&target)?;
            println!("System prompt ready at {}", written.display());
            Ok(())
        }
        Command::ConfigureGoogle { api_key, model } => cmd_configure_google(&api_key, model.as_deref()),
        Command::ConfigureTracing {
            enabled,
            endpoint,
            api_key,
            project,
        } => cmd_configure_tracing(
            &enabled,
            endpoint.as_deref(),
            api_key.as_deref(),
            project.as_deref(),
        ),
    }
}

fn cmd_chat(
    env: &HashMap<String, String>,
    opening_prompt: Option<&str>,
    timezone: Option<&str>,
    profile_path: Option<&Path>,
    max_steps: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve(timezone, profile_path, env);
    let profile_file = profile_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_profile_path(env));
    let profile = load_user_profile(&profile_file);
    let external_prompt = load_system_prompt(&default_system_prompt_path(env));

    println!(
        "tempo / model {} / timezone {}{}",
        config.model_name,
        config.timezone,
        if config.tracing_enabled {
            " / tracing on"
        } else {
            ""
        }
    );
    if !config.api_key_present {
        eprintln!("[chat] GOOGLE_API_KEY is not set; turns will fail until it is (tempo configure-google).");
    }

    let mut agent = GeminiAgent::new(&config, env, profile.as_ref(), external_prompt.as_deref(), max_steps)?;
    let stdin = io::stdin();
    run_session(&mut agent, opening_prompt, stdin.lock(), io::stdout())?;
    println!("Bye.");
    Ok(())
}

struct QuickCreateRequest {
    summary: String,
    start: String,
    end: String,
    timezone: Option<String>,
    location: Option<String>,
    description: Option<String>,
    color_id: Option<String>,
    calendar_id: Option<String>,
    profile: Option<PathBuf>,
}

/// "YYYY-MM-DD HH:MM" from the command line, validated before any network
/// call, then rendered with the seconds the Calendar API expects.
fn parse_cli_datetime(label: &str, raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    let parsed = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M").map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid {label} '{raw}': expected YYYY-MM-DD HH:MM"),
        )
    })?;
    Ok(parsed.format("%Y-%m-%dT%H:%M:00").to_string())
}

fn cmd_quick_create(
    env: &HashMap<String, String>,
    req: QuickCreateRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = parse_cli_datetime("start", &req.start)?;
    let end = parse_cli_datetime("end", &req.end)?;
    let config = resolve(req.timezone.as_deref(), req.profile.as_deref(), env);

    let mut fields = serde_json::Map::new();
    fields.insert("summary".to_string(), serde_json::json!(req.summary));
    fields.insert("start_datetime".to_string(), serde_json::json!(start));
    fields.insert("end_datetime".to_string(), serde_json::json!(end));
    if let Some(location) = &req.location {
        fields.insert("location".to_string(), serde_json::json!(location));
    }
    if let Some(description) = &req.description {
        fields.insert("description".to_string(), serde_json::json!(description));
    }
    if let Some(color_id) = &req.color_id {
        fields.insert("color_id".to_string(), serde_json::json!(color_id));
    }
    if let Some(calendar_id) = &req.calendar_id {
        fields.insert("calendar_id".to_string(), serde_json::json!(calendar_id));
    }

    let client = CalendarClient::from_env(env)?;
    let intent = CalendarIntent {
        op: CalendarOp::Create,
        fields: serde_json::Value::Object(fields),
    };
    let result = client.execute(&intent, &config.timezone)?;
    println!("{}", result.output);
    if let Some(link) = result.details.get("htmlLink").and_then(|v| v.as_str()) {
        println!("{link}");
    }
    Ok(())
}

fn cmd_list_calendars(env: &HashMap<String, String>) -> Result<(), Box<dyn std::error::Error>> {
    let client = CalendarClient::from_env(env)?;
    let intent = CalendarIntent {
        op: CalendarOp::ListCalendars,
        fields: serde_json::json!({}),
    };
    let result = client.execute(&intent, FALLBACK_TIMEZONE)?;
    let items = result
        .details
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    for item in &items {
        let id = item.get("id").and_then(|v| v.as_str()).unwrap_or("?");
        let summary = item.get("summary").and_then(|v| v.as_str()).unwrap_or("");
        let primary = item
            .get("primary")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        println!("{}{}  {}", if primary { "* " } else { "  " }, id, summary);
    }
    println!("{}", result.output);
    Ok(())
}

fn cmd_tools() -> Result<(), Box<dyn std::error::Error>> {
    for tool in tool_definitions_json() {
        let name = tool.get("name").and_then(|v| v.as_str()).unwrap_or("?");
        let desc = tool
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        println!("{name:18} {desc}");
    }
    Ok(())
}

fn cmd_env_info(env: &HashMap<String, String>) -> Result<(), Box<dyn std::error::Error>> {
    // (key, secret) pairs; secrets are only reported as set/unset.
    let keys: [(&str, bool); 11] = [
        (API_KEY_ENV_KEY, true),
        (MODEL_ENV_KEY, false),
        (TIMEZONE_ENV_KEY, false),
        (TOKEN_ENV_KEY, true),
        (TOKEN_FILE_ENV_KEY, false),
        (PROFILE_ENV_KEY, false),
        (SYSTEM_PROMPT_ENV_KEY, false),
        (TRACING_ENV_KEY, false),
        ("LANGSMITH_API_KEY", true),
        ("LANGSMITH_ENDPOINT", false),
        ("LANGSMITH_PROJECT", false),
    ];
    for (key, secret) in keys {
        let value = match (env_optional(env, key), secret) {
            (Some(_), true) => "SET".to_string(),
            (Some(v), false) => v,
            (None, _) => "-".to_string(),
        };
        println!("{key:28} {value}");
    }
    Ok(())
}

fn cmd_show_profile(
    env: &HashMap<String, String>,
    path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_profile_path(env));
    match load_user_profile(&target) {
        Some(profile) => {
            println!("{}", summarize_profile_for_system(&profile));
            Ok(())
        }
        None => Err(format!(
            "No readable profile at {} (tempo init-profile creates one).",
            target.display()
        )
        .into()),
    }
}

fn cmd_configure_google(
    api_key: &str,
    model: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(ENV_FILE);
    set_env_key(path, API_KEY_ENV_KEY, api_key)?;
    if let Some(model) = model {
        set_env_key(path, MODEL_ENV_KEY, model)?;
    }
    println!("Saved to {ENV_FILE}.");
    Ok(())
}

fn cmd_configure_tracing(
    enabled: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    project: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let flag = match enabled.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => "true",
        "false" | "0" | "no" | "off" => "false",
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid tracing flag '{other}': expected true or false"),
            )
            .into())
        }
    };
    let path = Path::new(ENV_FILE);
    set_env_key(path, TRACING_ENV_KEY, flag)?;
    if let Some(endpoint) = endpoint {
        set_env_key(path, "LANGSMITH_ENDPOINT", endpoint)?;
    }
    if let Some(api_key) = api_key {
        set_env_key(path, "LANGSMITH_API_KEY", api_key)?;
    }
    if let Some(project) = project {
        set_env_key(path, "LANGSMITH_PROJECT", project)?;
    }
    println!("Tracing {flag}; saved to {ENV_FILE}.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_datetime_is_validated_and_reshaped() {
        assert_eq!(
            parse_cli_datetime("start", "2025-06-01 10:30").unwrap(),
            "2025-06-01T10:30:00"
        );
        assert_eq!(
            parse_cli_datetime("start", "  2025-06-01 10:30  ").unwrap(),
            "2025-06-01T10:30:00"
        );
        let err = parse_cli_datetime("end", "tomorrow noon").unwrap_err();
        assert!(err.to_string().contains("expected YYYY-MM-DD HH:MM"));
        assert!(parse_cli_datetime("end", "2025-13-01 10:30").is_err());
    }
}
