//! Subscriber setup.

use tracing_subscriber::EnvFilter;

const CRATES: &[&str] = &[
    "codex",
    "codex_cli",
    "codex_state",
    "codex_sandbox",
    "codex_registry",
    "codex_analyzer",
    "codex_oracle",
];

/// Filter directives for `-v` repeated `verbosity` times.
pub fn directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => return "warn".to_string(),
        1 => "debug",
        _ => "trace",
    };
    std::iter::once("warn".to_string())
        .chain(CRATES.iter().map(|name| format!("{}={}", name, level)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Log to stderr. `RUST_LOG` takes precedence over `-v`.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        assert_eq!(directives(0), "warn");
    }

    #[test]
    fn verbose_raises_only_our_crates() {
        let d = directives(1);
        assert!(d.starts_with("warn,"));
        assert!(d.contains("codex_sandbox=debug"));
        assert!(!d.contains("reqwest"));
        assert!(directives(3).contains("codex_oracle=trace"));
    }
}
