//! Shared output layer: human text or stable JSON for every command.

use serde::Serialize;
use std::io::{self, Write};

/// Shared width for human separators.
pub const RULE_WIDTH: usize = 60;

pub fn rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = RULE_WIDTH)
}

/// Write a heading followed by a separator.
pub fn section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    rule(w)
}

/// Left-aligned key/value line.
pub fn kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub const fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render `value` as pretty JSON, or through `human` otherwise.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Human => human(value, &mut out)?,
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Build from any error, picking up the engine's code and hint when the
    /// chain contains a `StoreError`.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let store_error = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<pagekeep_core::StoreError>());
        Self {
            message: format!("{err:#}"),
            hint: store_error.and_then(|e| e.hint()).map(str::to_string),
            error_code: store_error.map(|e| e.code().code().to_string()),
        }
    }
}

/// Write an error to stderr in the requested mode.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, &serde_json::json!({ "error": error }))?;
            writeln!(out)?;
        }
        OutputMode::Human => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(hint) = &error.hint {
                writeln!(out, "  hint: {hint}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_selects_mode() {
        assert!(OutputMode::from_json_flag(true).is_json());
        assert!(!OutputMode::from_json_flag(false).is_json());
    }

    #[test]
    fn kv_pads_keys() {
        let mut buf = Vec::new();
        kv(&mut buf, "state", "fetched").expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "state:         fetched\n");
    }

    #[test]
    fn store_errors_carry_code_and_hint() {
        let err = anyhow::Error::new(pagekeep_core::StoreError::Poisoned).context("refresh failed");
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E5002"));
        assert!(cli.hint.is_some());
        assert!(cli.message.starts_with("refresh failed"));
    }

    #[test]
    fn plain_errors_have_no_code() {
        let cli = CliError::from_anyhow(&anyhow::anyhow!("boom"));
        assert!(cli.error_code.is_none());
        assert_eq!(cli.message, "boom");
    }
}
