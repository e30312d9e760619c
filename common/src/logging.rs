// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Shared logging setup.  Every daemon and test harness in the workspace
//! builds its root logger through here so the drain configuration lives in
//! one place.

use std::fs::OpenOptions;
use std::str::FromStr;

use anyhow::Context;
use slog::Drain;

/// The on-the-wire format of emitted log records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable terminal output
    Human,
    /// Bunyan-style newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            _ => Err("invalid log format"),
        }
    }
}

fn async_root<D>(drain: D, name: &str) -> slog::Logger
where
    D: Drain<Ok = (), Err = slog::Never> + Send + 'static,
{
    let drain = slog_async::Async::new(drain)
        .chan_size(32768)
        .build()
        .fuse();
    slog::Logger::root(drain, slog::o!("name" => name.to_string()))
}

/// Build the process-wide root logger, writing to `log_file` if one is given
/// and to stdout otherwise.  `format` defaults to human-readable output.
pub fn init(
    name: &str,
    log_file: &Option<String>,
    format: Option<LogFormat>,
) -> anyhow::Result<slog::Logger> {
    let format = format.unwrap_or(LogFormat::Human);

    let log = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {path}"))?;
            match format {
                LogFormat::Human => {
                    let dec = slog_term::PlainDecorator::new(file);
                    let drain =
                        slog_term::FullFormat::new(dec).build().fuse();
                    async_root(drain, name)
                }
                LogFormat::Json => {
                    let bunyan_name: &'static str =
                        Box::leak(name.to_string().into_boxed_str());
                    let drain = slog_bunyan::with_name(bunyan_name, file)
                        .build()
                        .fuse();
                    async_root(drain, name)
                }
            }
        }
        None => match format {
            LogFormat::Human => {
                let dec = slog_term::TermDecorator::new().build();
                let drain = slog_term::FullFormat::new(dec).build().fuse();
                async_root(drain, name)
            }
            LogFormat::Json => {
                let bunyan_name: &'static str =
                    Box::leak(name.to_string().into_boxed_str());
                let drain =
                    slog_bunyan::with_name(bunyan_name, std::io::stdout())
                        .build()
                        .fuse();
                async_root(drain, name)
            }
        },
    };

    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::LogFormat;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::Human, "human".parse().unwrap());
        assert_eq!(LogFormat::Json, "JSON".parse().unwrap());
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
