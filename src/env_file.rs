use std::path::Path;

/// Update or append a `KEY=value` line in a dotenv-style file, preserving
/// every other line verbatim. Used by the `configure-*` commands so credential
/// edits survive across sessions without hand-editing.
pub(crate) fn set_env_key(
    path: &Path,
    key: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let existing = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err.into()),
    };

    let rendered = format_env_line(key, value);
    let mut lines: Vec<String> = Vec::new();
    let mut replaced = false;
    for line in existing.lines() {
        if !replaced && line_sets_key(line, key) {
            lines.push(rendered.clone());
            replaced = true;
        } else {
            lines.push(line.to_string());
        }
    }
    if !replaced {
        lines.push(rendered);
    }

    let mut body = lines.join("\n");
    body.push('\n');
    let tmp = path.with_extension("env.tmp");
    std::fs::write(&tmp, &body)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn line_sets_key(line: &str, key: &str) -> bool {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    match trimmed.split_once('=') {
        Some((name, _)) => name.trim() == key,
        None => false,
    }
}

fn format_env_line(key: &str, value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '#' || c == '"');
    if needs_quotes {
        format!("{key}=\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        format!("{key}={value}")
    }
}
