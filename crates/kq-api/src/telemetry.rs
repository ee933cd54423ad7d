//! Tracing subscriber setup: JSON to stdout plus a plain-text query log.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Plain-text layer appending to the query log at `path`.
pub fn query_log_layer<S>(
    path: &Path,
) -> io::Result<fmt::Layer<S, fmt::format::DefaultFields, fmt::format::Format, Mutex<File>>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file)))
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init(query_log: &Path) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json())
        .with(query_log_layer(query_log)?)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_log_appends_plain_text() {
        let path = std::env::temp_dir().join(format!("kq-query-log-{}.log", uuid::Uuid::now_v7()));
        std::fs::write(&path, "earlier line\n").unwrap();

        let subscriber = tracing_subscriber::registry().with(query_log_layer(&path).unwrap());
        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("query", request_id = "abc");
            let _guard = span.enter();
            tracing::info!(query_type = "count_nodes", "classified query");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(contents.starts_with("earlier line\n"));
        assert!(contents.contains("classified query"));
        assert!(contents.contains("query_type=\"count_nodes\""));
        assert!(contents.contains("request_id"));
        assert!(!contents.contains('\u{1b}'), "no ANSI escapes in the log file");
    }

    #[test]
    fn query_log_open_failure_is_reported() {
        let dir = std::env::temp_dir();
        let result = query_log_layer::<tracing_subscriber::Registry>(&dir);
        assert!(result.is_err());
    }
}
