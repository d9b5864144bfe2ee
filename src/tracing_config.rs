//! Tracing subscriber setup.
//!
//! `QUILL_LOG` selects what is logged (same syntax as `RUST_LOG`, which is
//! honoured as a fallback) and `QUILL_LOG_FORMAT` selects how:
//!
//! - `text` (default): flat `tracing-subscriber` lines
//! - `tree`: indented span hierarchy via `tracing-tree`, handy for following a
//!   fork/merge run batch by batch
//! - `json`: one JSON object per event
//!
//! ```bash
//! QUILL_LOG=debug QUILL_LOG_FORMAT=tree cargo test -p quill --test pipeline_tests
//! QUILL_LOG="quill_core::substitution=debug,quill=info" cargo test
//! ```
//!
//! Nothing is installed unless one of the two filter variables is set.

use std::io;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

const LOG_VAR: &str = "QUILL_LOG";
const FORMAT_VAR: &str = "QUILL_LOG_FORMAT";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Tree,
    Json,
}

impl LogFormat {
    /// Case-insensitive; anything unrecognised is `Text`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "tree" => LogFormat::Tree,
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }

    fn from_env() -> Self {
        std::env::var(FORMAT_VAR)
            .map(|value| LogFormat::parse(&value))
            .unwrap_or_default()
    }
}

/// Filter directives from `QUILL_LOG`, else `RUST_LOG`, else `None`.
fn filter_from_env() -> Option<EnvFilter> {
    if let Ok(directives) = std::env::var(LOG_VAR) {
        return Some(EnvFilter::builder().parse_lossy(directives));
    }
    if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
        return Some(EnvFilter::from_default_env());
    }
    None
}

/// Install the global subscriber described by the environment.
///
/// Returns `false` when logging was not requested or a subscriber is
/// already installed (tests call this repeatedly). Output goes to stderr.
pub fn init_tracing() -> bool {
    let Some(filter) = filter_from_env() else {
        return false;
    };

    let installed = match LogFormat::from_env() {
        LogFormat::Tree => {
            let layer = tracing_tree::HierarchicalLayer::default()
                .with_writer(io::stderr)
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_targets(true)
                .with_thread_ids(true);
            Registry::default().with(filter).with(layer).try_init()
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(io::stderr);
            Registry::default().with(filter).with(layer).try_init()
        }
        LogFormat::Text => {
            let layer = fmt::layer().with_thread_names(true).with_writer(io::stderr);
            Registry::default().with(filter).with(layer).try_init()
        }
    };
    installed.is_ok()
}
