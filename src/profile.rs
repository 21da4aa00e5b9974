use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::env_optional;

pub(crate) const PROFILE_ENV_KEY: &str = "CALENDAR_CLI_PROFILE";
pub(crate) const DEFAULT_PROFILE_PATH: &str = "user_profile.json";

/// Scheduling preferences the agent folds into its system instructions.
/// Every field is optional; an absent profile file is not an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct UserProfile {
    /// IANA timezone, e.g. "Europe/Istanbul".
    #[serde(default)]
    pub(crate) timezone: Option<String>,
    /// Active work days, e.g. ["mon", "tue", "wed", "thu", "fri"].
    #[serde(default)]
    pub(crate) workdays: Option<Vec<String>>,
    /// Per-day working window, e.g. {"mon": "09:00-18:00"}.
    #[serde(default)]
    pub(crate) working_hours: Option<HashMap<String, String>>,
    /// Lunch break window, e.g. "12:30-13:30".
    #[serde(default)]
    pub(crate) lunch: Option<String>,
    /// Windows to keep free of meetings, e.g. ["Fri 14:00-16:00"].
    #[serde(default)]
    pub(crate) no_meetings: Option<Vec<String>>,
    /// Preferred deep work windows, e.g. ["09:00-11:00", "16:00-18:00"].
    #[serde(default)]
    pub(crate) preferred_deep_work: Option<Vec<String>>,
    /// General avoid windows, e.g. ["18:00-21:00"].
    #[serde(default)]
    pub(crate) avoid_times: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

pub(crate) fn default_profile_path(env: &HashMap<String, String>) -> PathBuf {
    env_optional(env, PROFILE_ENV_KEY)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILE_PATH))
}

fn template_profile() -> UserProfile {
    let mut hours = HashMap::new();
    for day in ["mon", "tue", "wed", "thu", "fri"] {
        hours.insert(day.to_string(), "09:00-18:00".to_string());
    }
    UserProfile {
        timezone: Some("Europe/Istanbul".to_string()),
        workdays: Some(
            ["mon", "tue", "wed", "thu", "fri"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
        ),
        working_hours: Some(hours),
        lunch: Some("12:30-13:30".to_string()),
        no_meetings: Some(vec!["Fri 14:00-16:00".to_string()]),
        preferred_deep_work: Some(vec!["09:00-11:00".to_string(), "16:00-18:00".to_string()]),
        avoid_times: Some(vec!["18:00-21:00".to_string()]),
        notes: Some("Personal preferences: avoid late-night heavy tasks.".to_string()),
    }
}

/// Write a starter profile if the target does not already exist.
/// Returns the path that now holds a profile.
pub(crate) fn write_default_profile_template(
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
    let json = serde_json::to_string_pretty(&template_profile())?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, format!("{json}\n"))?;
    fs::rename(&tmp, path)?;
    Ok(path.to_path_buf())
}

/// Load the user profile if present. Missing or malformed files yield `None`
/// so that resolution can fall through to the next configuration source.
pub(crate) fn load_user_profile(path: &Path) -> Option<UserProfile> {
    let data = fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

/// Short, model-friendly rendering of the profile constraints.
pub(crate) fn summarize_profile_for_system(profile: &UserProfile) -> String {
    let mut lines = vec!["User profile:".to_string()];
    if let Some(tz) = &profile.timezone {
        lines.push(format!("- Timezone: {tz}"));
    }
    if let Some(days) = &profile.workdays {
        lines.push(format!("- Workdays: {}", days.join(", ")));
    }
    if let Some(hours) = &profile.working_hours {
        let mut parts: Vec<String> = hours.iter().map(|(d, w)| format!("{d}: {w}")).collect();
        parts.sort();
        lines.push(format!("- Working hours: {}", parts.join("; ")));
    }
    if let Some(lunch) = &profile.lunch {
        lines.push(format!("- Lunch break: {lunch}"));
    }
    if let Some(windows) = &profile.no_meetings {
        lines.push(format!("- No meetings: {}", windows.join("; ")));
    }
    if let Some(windows) = &profile.preferred_deep_work {
        lines.push(format!("- Deep work preferences: {}", windows.join("; ")));
    }
    if let Some(windows) = &profile.avoid_times {
        lines.push(format!("- Avoid times: {}", windows.join("; ")));
    }
    if let Some(notes) = &profile.notes {
        lines.push(format!("- Notes: {notes}"));
    }
    lines.join("\n")
}
