use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tempo")]
#[command(about = "Gemini-backed Google Calendar assistant", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Interactive scheduling session with the agent.
    Chat {
        /// First message to send before reading from stdin.
        prompt: Option<String>,
        /// IANA timezone override (e.g. Europe/Istanbul).
        #[arg(short, long)]
        timezone: Option<String>,
        /// Path to the user profile file.
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Max model/tool round-trips per turn.
        #[arg(long)]
        max_steps: Option<usize>,
    },

    /// Create a single event without going through the model.
    QuickCreate {
        /// Event title.
        summary: String,
        /// Start, "YYYY-MM-DD HH:MM".
        start: String,
        /// End, "YYYY-MM-DD HH:MM".
        end: String,
        /// IANA timezone override.
        #[arg(short, long)]
        timezone: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Google Calendar color id (1-11).
        #[arg(long)]
        color_id: Option<String>,
        /// Target calendar. Defaults to primary.
        #[arg(long)]
        calendar_id: Option<String>,
        /// Path to the user profile file (timezone fallback).
        #[arg(long)]
        profile: Option<PathBuf>,
    },

    /// List the calendars the authenticated account can access.
    ListCalendars,

    /// List the calendar tools the agent can call.
    Tools,

    /// Show which configuration keys are set (secrets redacted).
    EnvInfo,

    /// Write a starter user profile, without overwriting an existing one.
    InitProfile {
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Print the resolved user profile.
    ShowProfile {
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Write a starter system prompt file, without overwriting an existing one.
    InitSystemPrompt {
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Store the Google API key (and optionally the model) in .env.
    ConfigureGoogle {
        api_key: String,
        #[arg(long)]
        model: Option<String>,
    },

    /// Enable or disable LangSmith tracing in .env.
    ConfigureTracing {
        /// "true" or "false".
        enabled: String,
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        project: Option<String>,
    },
}
