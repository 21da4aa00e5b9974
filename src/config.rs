use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::{default_profile_path, env_bool, env_optional, load_user_profile};

pub(crate) const TIMEZONE_ENV_KEY: &str = "CLI_DEFAULT_TIMEZONE";
pub(crate) const MODEL_ENV_KEY: &str = "GEMINI_MODEL";
pub(crate) const API_KEY_ENV_KEY: &str = "GOOGLE_API_KEY";
pub(crate) const TRACING_ENV_KEY: &str = "LANGSMITH_TRACING";

pub(crate) const FALLBACK_TIMEZONE: &str = "Etc/UTC";
pub(crate) const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Operating parameters for one process run. Resolved once in `main` and
/// passed by reference from there on; never mutated.
#[derive(Debug, Clone)]
pub(crate) struct EffectiveConfig {
    pub(crate) timezone: String,
    pub(crate) model_name: String,
    pub(crate) api_key_present: bool,
    pub(crate) tracing_enabled: bool,
}

/// Validate a timezone candidate and normalize it to an IANA zone name.
/// Bare "UTC" becomes "Etc/UTC" (some consumers reject the short spelling).
pub(crate) fn normalize_timezone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.eq_ignore_ascii_case("utc") {
        FALLBACK_TIMEZONE
    } else {
        trimmed
    };
    Tz::from_str(candidate).ok().map(|tz| tz.name().to_string())
}

/// Merge the four timezone sources in precedence order:
/// CLI argument > profile file > CLI_DEFAULT_TIMEZONE > Etc/UTC.
///
/// The profile file is only read when no usable CLI argument was supplied,
/// and a read or parse failure there falls through silently. Candidates
/// that are not resolvable IANA zones also fall through, so the result is
/// always a valid zone name.
pub(crate) fn resolve(
    cli_timezone: Option<&str>,
    profile_path: Option<&Path>,
    env: &HashMap<String, String>,
) -> EffectiveConfig {
    let timezone = resolve_timezone(cli_timezone, profile_path, env);
    EffectiveConfig {
        timezone,
        model_name: env_optional(env, MODEL_ENV_KEY).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        api_key_present: env_optional(env, API_KEY_ENV_KEY).is_some(),
        tracing_enabled: env_bool(env, TRACING_ENV_KEY, false),
    }
}

fn resolve_timezone(
    cli_timezone: Option<&str>,
    profile_path: Option<&Path>,
    env: &HashMap<String, String>,
) -> String {
    let cli_supplied = cli_timezone.map(|s| !s.trim().is_empty()).unwrap_or(false);
    if let Some(tz) = cli_timezone.and_then(normalize_timezone) {
        return tz;
    }
    // Lazy: no profile I/O once an explicit argument was supplied.
    if !cli_supplied {
        let path = profile_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_profile_path(env));
        if let Some(tz) = load_user_profile(&path)
            .and_then(|p| p.timezone)
            .and_then(|tz| normalize_timezone(&tz))
        {
            return tz;
        }
    }
    if let Some(tz) = env_optional(env, TIMEZONE_ENV_KEY).and_then(|tz| normalize_timezone(&tz)) {
        return tz;
    }
    FALLBACK_TIMEZONE.to_string()
}
