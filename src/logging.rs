use crate::llm_extractor::TokenUsage;
use crate::utils::{pad_to_width, truncate_str, wrap_text};
use crate::ExtractError;
use serde_json::Value;
use tracing::{error, info};

#[cfg(feature = "logging")]
use std::path::PathBuf;
#[cfg(feature = "logging")]
use tracing::debug;
#[cfg(feature = "logging")]
use tracing_appender::rolling::{RollingFileAppender, Rotation};
#[cfg(feature = "logging")]
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

const CARD_WIDTH: usize = 72;
const CONTENT_WIDTH: usize = CARD_WIDTH - 4;

#[cfg(feature = "logging")]
#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

#[cfg(feature = "logging")]
impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "warn".into(),
            console_output: true,
            file_output: false,
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides `config.log_level`.
#[cfg(feature = "logging")]
pub fn setup_logging(config: LogConfig) -> Result<(), ExtractError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_span_events(subscriber_fmt::format::FmtSpan::CLOSE);
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir).map_err(|source| ExtractError::Io {
            path: config.log_dir.clone(),
            source,
        })?;

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "structured-extract.log");

        let file_layer = subscriber_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(file_appender);

        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| ExtractError::ConfigError(format!("Failed to install log subscriber: {e}")))?;

    debug!("Logging system initialized with config: {:?}", config);
    Ok(())
}

/// Renders a JSON value as an indented tree headed by `title`.
///
/// ```text
/// Graph
/// ├── title: Tree cover loss
/// └── legend
///     ├── [0]: 2001
///     └── [1]: 2020
/// ```
pub fn render_result(title: &str, value: &Value) -> String {
    let mut out = String::from(title);
    match value {
        Value::Object(_) | Value::Array(_) => render_children(value, "", &mut out),
        scalar => {
            out.push_str(": ");
            out.push_str(&scalar_text(scalar));
        }
    }
    out
}

fn render_children(value: &Value, prefix: &str, out: &mut String) {
    let entries: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("[{i}]"), v))
            .collect(),
        _ => return,
    };

    let count = entries.len();
    for (i, (label, child)) in entries.into_iter().enumerate() {
        let (branch, indent) = if i + 1 == count {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push('\n');
        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&label);

        match child {
            Value::Object(map) if map.is_empty() => out.push_str(": {}"),
            Value::Array(items) if items.is_empty() => out.push_str(": []"),
            Value::Object(_) | Value::Array(_) => {
                render_children(child, &format!("{prefix}{indent}"), out)
            }
            scalar => {
                out.push_str(": ");
                out.push_str(&scalar_text(scalar));
            }
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn card_line(text: &str) -> String {
    format!("║ {} ║", pad_to_width(&truncate_str(text, CONTENT_WIDTH), CONTENT_WIDTH))
}

pub fn log_result_card(title: &str, value: &Value, model: &str, usage: Option<&TokenUsage>) {
    let top_bottom = "═".repeat(CARD_WIDTH - 2);
    let middle = "─".repeat(CARD_WIDTH - 2);

    let mut lines = vec![card_line(&format!("Model: {model}"))];
    if let Some(usage) = usage {
        lines.push(card_line(&format!(
            "Tokens: {} prompt + {} completion = {}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        )));
    }
    lines.push(format!("║{middle}║"));
    lines.extend(render_result(title, value).lines().map(card_line));

    info!("\n╔{}╗\n{}\n╚{}╝", top_bottom, lines.join("\n"), top_bottom);
}

/// Logs a failed run: the source it worked on, the terminal state, and the
/// error with its cause chain.
pub fn log_error_card(source: &str, error: &ExtractError) {
    let top_bottom = "═".repeat(CARD_WIDTH - 2);
    let middle = "─".repeat(CARD_WIDTH - 2);

    let mut details = error.to_string();
    let mut cause = std::error::Error::source(error);
    while let Some(inner) = cause {
        let text = inner.to_string();
        if !details.contains(&text) {
            details = format!("{details} (caused by: {text})");
        }
        cause = inner.source();
    }

    let mut lines = vec![
        card_line(&format!("Source: {source}")),
        card_line(&format!("State: {}", error.kind())),
        format!("║{middle}║"),
    ];
    lines.extend(
        wrap_text(&format!("Error: {details}"), CONTENT_WIDTH)
            .iter()
            .map(|line| card_line(line)),
    );

    error!("\n╔{}╗\n{}\n╚{}╝", top_bottom, lines.join("\n"), top_bottom);
}
