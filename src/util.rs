use std::collections::HashMap;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

/// Snapshot of the process environment, taken once at startup after the
/// optional `.env` load. Everything downstream reads this map instead of
/// touching `std::env` mid-turn.
pub(crate) fn env_snapshot() -> HashMap<String, String> {
    std::env::vars().collect()
}

pub(crate) fn env_optional(env: &HashMap<String, String>, name: &str) -> Option<String> {
    env.get(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn env_u64(
    env: &HashMap<String, String>,
    name: &str,
    default: u64,
) -> Result<u64, Box<dyn std::error::Error>> {
    match env_optional(env, name) {
        Some(value) => Ok(value
            .parse::<u64>()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid {name}")))?),
        None => Ok(default),
    }
}

pub(crate) fn env_usize(
    env: &HashMap<String, String>,
    name: &str,
    default: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    match env_optional(env, name) {
        Some(value) => Ok(value
            .parse::<usize>()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid {name}")))?),
        None => Ok(default),
    }
}

pub(crate) fn env_f64(
    env: &HashMap<String, String>,
    name: &str,
    default: f64,
) -> Result<f64, Box<dyn std::error::Error>> {
    match env_optional(env, name) {
        Some(value) => Ok(value
            .parse::<f64>()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid {name}")))?),
        None => Ok(default),
    }
}

pub(crate) fn env_bool(env: &HashMap<String, String>, name: &str, default: bool) -> bool {
    match env_optional(env, name) {
        Some(value) => {
            let v = value.to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "yes" | "y" | "on")
        }
        None => default,
    }
}

pub(crate) fn jitter_ratio() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

pub(crate) fn parse_retry_after(resp: &ureq::Response) -> Option<f64> {
    resp.header("retry-after")
        .and_then(|v| v.trim().parse::<f64>().ok())
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
    fn optional_trims_and_drops_empty() {
        let env = env_with(&[("A", "  x  "), ("B", "   ")]);
        assert_eq!(env_optional(&env, "A").as_deref(), Some("x"));
        assert_eq!(env_optional(&env, "B"), None);
        assert_eq!(env_optional(&env, "C"), None);
    }

    #[test]
    fn numeric_defaults_and_invalid() {
        let env = env_with(&[("N", "7"), ("BAD", "x")]);
        assert_eq!(env_u64(&env, "N", 3).unwrap(), 7);
        assert_eq!(env_u64(&env, "MISSING", 3).unwrap(), 3);
        assert!(env_u64(&env, "BAD", 3).is_err());
        assert_eq!(env_f64(&env, "MISSING", 0.5).unwrap(), 0.5);
    }

    #[test]
    fn bool_accepts_truthy_spellings() {
        for v in ["1", "true", "YES", "on", "y"] {
            let env = env_with(&[("F", v)]);
            assert!(env_bool(&env, "F", false), "{v} should be truthy");
        }
        let env = env_with(&[("F", "0")]);
        assert!(!env_bool(&env, "F", true));
        let env = env_with(&[]);
        assert!(env_bool(&env, "F", true));
    }
}
