use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{env_optional, summarize_profile_for_system, UserProfile};

pub(crate) const SYSTEM_PROMPT_ENV_KEY: &str = "CALENDAR_CLI_SYSTEM_PROMPT";
pub(crate) const DEFAULT_SYSTEM_PROMPT_PATH: &str = "system_prompt.md";

const SYSTEM_PROMPT_TEMPLATE: &str = "\
# System Prompt (edit freely)

Role: time-management consultant and calendar agent.
Goal: answer the user's request briefly and precisely; perform safe calendar
operations (create/search/update/move/delete) when needed.
Style: no padding. End each answer only with: 'Want me to add suggestions
and a short scientific rationale? (Y/N)'.

Internal rules (summary):
- Biological clock: 09:00-11:00 and 16:00-18:00 are mental peaks; focus
  drops around 14:00 and late in the day.
- Time management: plan important work at peaks, avoid procrastination,
  watch for traps (pointless meetings, social media); say no when needed.
- Breaks and health: 20-20-20 eye rule; a 5-10 minute active break every
  60-90 minutes; posture changes and stretching.
- Process: time log, importance-urgency matrix, execute, end-of-day review.
- Placement: high-focus work at peaks; routine work in low-energy hours;
  creative work early morning or calm evening, depending on personal rhythm.

Note: replace this text with your own methodology if you prefer.
";

pub(crate) fn default_system_prompt_path(env: &HashMap<String, String>) -> PathBuf {
    env_optional(env, SYSTEM_PROMPT_ENV_KEY)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSTEM_PROMPT_PATH))
}

/// Write an editable system prompt template if the target does not exist.
pub(crate) fn write_default_system_prompt_template(
    path: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("md.tmp");
    fs::write(&tmp, SYSTEM_PROMPT_TEMPLATE)?;
    fs::rename(&tmp, path)?;
    Ok(path.to_path_buf())
}

/// Load the external system prompt if present; read failures are non-fatal.
pub(crate) fn load_system_prompt(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Assemble the full system instructions for one session: the built-in role
/// text, the current datetime in the effective timezone and in UTC, the
/// profile summary when present, and any external prompt prepended.
pub(crate) fn build_system_instructions(
    timezone: &str,
    profile: Option<&UserProfile>,
    external_prompt: Option<&str>,
    now_utc: DateTime<Utc>,
) -> String {
    let now_local = Tz::from_str(timezone)
        .map(|tz| {
            now_utc
                .with_timezone(&tz)
                .format("%Y-%m-%d %H:%M:%S %Z%z")
                .to_string()
        })
        .unwrap_or_else(|_| now_utc.format("%Y-%m-%d %H:%M:%S %Z%z").to_string());

    let mut instructions = String::new();
    if let Some(external) = external_prompt {
        instructions.push_str(external.trim());
        instructions.push_str("\n\n");
    }
    instructions.push_str(
        "Role: you are a time-management consultant and calendar agent with \
         expertise in human biology, circadian rhythm, ergonomics, and \
         productivity. Goal: answer the user's request as briefly and \
         clearly as possible and, when needed, perform safe calendar \
         operations (create/search/update/move/delete). Check for conflicts \
         and constraints; never make unauthorized or destructive changes.\n\n\
         Default style: answer the question directly; avoid unsolicited \
         advice and long explanations. End each answer only with: 'Want me \
         to add suggestions and a short scientific rationale? (Y/N)'. Add \
         short suggestions plus a brief rationale only after a 'Y'.\n\n\
         Planning principles (internal rules):\n\
         - Biological clock: 09:00-11:00 and 16:00-18:00 are mental peaks; \
         focus drops around 14:00 and late in the day.\n\
         - Three dimensions of time management: planning (important work at \
         peaks), attitude (time is finite; do not procrastinate), traps \
         (pointless meetings, unannounced visits, social media; say no when \
         needed).\n\
         - Breaks and health: 20-20-20 eye rule; a 5-10 minute active break \
         every 60-90 minutes; posture changes and stretching.\n\
         - Process: time log and analysis, importance-urgency matrix, \
         execute, review deviations at end of day.\n\
         - Task placement: high-focus work at peaks; routine work in \
         low-energy hours; creative work early morning or calm evening, \
         depending on personal rhythm.\n\
         - If free slots are given, fill them with suitable tasks; otherwise \
         offer alternative windows.\n\n\
         Output behavior: produce an hour-by-hour task plan only when the \
         user explicitly asks for a daily plan. Add breaks/exercise, \
         eye/posture, difficulty ordering, and rationale sections only after \
         the user answers 'Y'.\n\n",
    );
    instructions.push_str(&format!("Current datetime (local): {now_local}\n"));
    instructions.push_str(&format!(
        "Current datetime (UTC):   {}",
        now_utc.format("%Y-%m-%d %H:%M:%S %Z%z")
    ));
    if let Some(profile) = profile {
        instructions.push_str("\n\n");
        instructions.push_str(&summarize_profile_for_system(profile));
    }
    instructions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn local_time_uses_effective_timezone() {
        let text = build_system_instructions("Europe/Istanbul", None, None, fixed_now());
        // Istanbul is UTC+3 year round.
        assert!(text.contains("Current datetime (local): 2025-06-01 15:00:00"));
        assert!(text.contains("Current datetime (UTC):   2025-06-01 12:00:00"));
    }

    #[test]
    fn profile_summary_is_appended() {
        let profile = UserProfile {
            timezone: Some("Europe/Istanbul".to_string()),
            ..UserProfile::default()
        };
        let text = build_system_instructions("Etc/UTC", Some(&profile), None, fixed_now());
        assert!(text.contains("User profile:"));
        assert!(text.contains("Timezone: Europe/Istanbul"));
    }

    #[test]
    fn external_prompt_is_prepended() {
        let text =
            build_system_instructions("Etc/UTC", None, Some("My own method.\n"), fixed_now());
        assert!(text.starts_with("My own method."));
        assert!(text.contains("Role: you are a time-management consultant"));
    }

    #[test]
    fn template_write_and_load() {
        let dir = std::env::temp_dir().join("tempo_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("prompt_{}.md", std::process::id()));
        let _ = std::fs::remove_file(&path);
        assert!(load_system_prompt(&path).is_none());
        write_default_system_prompt_template(&path).unwrap();
        let loaded = load_system_prompt(&path).expect("template should load");
        assert!(loaded.contains("time-management consultant"));
        std::fs::remove_file(&path).ok();
    }
}
