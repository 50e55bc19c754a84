//! Tracing setup for the server and the offline subcommands.
//!
//! - LOG_LEVEL holds `EnvFilter` directives; a bare level such as "debug" is
//!   applied to the crate's own targets and leaves dependencies at info.
//! - LOG_FORMAT picks "pretty" (default), "compact" or "json".
//!
//! Targets used across the crate: `vocab_backend`, `catalog`, `words`,
//! `session`, `profile`, `youtube`.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

const CRATE_TARGETS: [&str; 6] = ["vocab_backend", "catalog", "words", "session", "profile", "youtube"];

const DEFAULT_DIRECTIVES: &str =
    "info,catalog=debug,words=debug,session=debug,profile=debug,vocab_backend=debug,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown LOG_FORMAT '{}'", other)),
        }
    }
}

/// Directive string for a LOG_LEVEL value. Anything containing `=` or `,` is used verbatim.
fn directives_for(level: Option<&str>) -> String {
    match level.map(str::trim).filter(|l| !l.is_empty()) {
        None => DEFAULT_DIRECTIVES.to_string(),
        Some(l) if l.contains('=') || l.contains(',') => l.to_string(),
        Some(l) => {
            let own: Vec<String> = CRATE_TARGETS.iter().map(|t| format!("{}={}", t, l)).collect();
            format!("info,{}", own.join(","))
        }
    }
}

pub fn init_tracing() {
    let level = std::env::var("LOG_LEVEL").ok();
    let directives = directives_for(level.as_deref());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let format_var = std::env::var("LOG_FORMAT").unwrap_or_default();
    let (format, format_err) = match format_var.parse::<LogFormat>() {
        Ok(f) => (f, None),
        Err(e) => (LogFormat::default(), Some(e)),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Each format has its own builder type.
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }

    if let Some(e) = format_err {
        tracing::warn!(target: "vocab_backend", error = %e, "Falling back to pretty logs");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_applies_to_crate_targets_only() {
        let d = directives_for(Some("trace"));
        assert!(d.starts_with("info,"));
        assert!(d.contains("words=trace"));
        assert!(d.contains("youtube=trace"));
        assert!(!d.contains("tower_http"));
    }

    #[test]
    fn full_directives_and_defaults() {
        assert_eq!(directives_for(Some("warn,catalog=debug")), "warn,catalog=debug");
        assert_eq!(directives_for(None), DEFAULT_DIRECTIVES);
        assert_eq!(directives_for(Some("  ")), DEFAULT_DIRECTIVES);
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
