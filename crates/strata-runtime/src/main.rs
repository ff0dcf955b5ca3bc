// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The Strata runtime binary.
//!
//! Launches one kernel per thread role the session needs and exits with the
//! most severe kernel result.
//!
//! ```bash
//! # Render + simulation + platform pump, stop after 600 rendered frames
//! strata-runtime client --frames 600
//!
//! # Headless simulation for ten seconds
//! strata-runtime --role server --run-for 10 --config strata.toml
//! ```

mod demo;

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use crossbeam_channel::Sender;
use demo::{DemoOptions, PlatformEvent};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use strata_sdk::prelude::*;

/// Strata runtime: affinity-scheduled Main, Game and Render kernels.
#[derive(Parser, Debug)]
#[command(name = "strata-runtime")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Launch role: `client`, `server` (or `dedicated`), `both` (or `host`).
    #[arg(value_name = "ROLE")]
    role: Option<String>,

    /// Launch role, as a flag.
    #[arg(long = "role", value_name = "ROLE", conflicts_with = "role")]
    role_flag: Option<String>,

    /// Runtime configuration file (TOML).
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop the session after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    run_for: Option<f64>,

    /// Stop the session after the presenter rendered this many frames.
    #[arg(long, value_name = "N")]
    frames: Option<u64>,
}

impl Cli {
    fn role(&self) -> Role {
        self.role
            .as_deref()
            .or(self.role_flag.as_deref())
            .map(Role::parse_lenient)
            .unwrap_or_default()
    }
}

fn main() {
    let code = match run(Cli::parse()) {
        Ok(code) => code,
        Err(error) => {
            log::error!("{error:#}");
            eprintln!("strata-runtime: {error:#}");
            ExitCode::Fatal
        }
    };
    std::process::exit(code.code());
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    let config = demo::with_default_frame_cap(config);
    init_logging(&config);

    let role = cli.role();
    log::info!("Starting Strata runtime as {role}.");

    let builder = Application::builder().role(role).config(config);
    let (builder, events) = demo::install(
        builder,
        DemoOptions {
            frame_limit: cli.frames,
        },
    )?;
    let app = builder.build().context("Failed to assemble the application")?;

    if let Some(seconds) = cli.run_for {
        let duration = Duration::try_from_secs_f64(seconds)
            .with_context(|| format!("Invalid --run-for value {seconds}"))?;
        spawn_timer(duration, role, events, app.cancellation_token())?;
    }

    let code = app.run();
    log::info!("Strata runtime exiting with {code}.");
    Ok(code)
}

/// `RUST_LOG` wins over the configured filter, which wins over `info`.
fn init_logging(config: &RuntimeConfig) {
    use env_logger::{Builder, Env};

    let fallback = config.log_filter.as_deref().unwrap_or("info");
    Builder::from_env(Env::default().default_filter_or(fallback)).init();
}

/// Ends the session after `duration`: through a close request when a platform
/// pump is running, by cancelling the session otherwise.
fn spawn_timer(
    duration: Duration,
    role: Role,
    events: Sender<PlatformEvent>,
    token: CancellationToken,
) -> Result<()> {
    if duration.is_zero() {
        bail!("--run-for must be greater than zero");
    }

    thread::Builder::new()
        .name("strata-timer".into())
        .spawn(move || {
            thread::sleep(duration);
            log::info!("Run time of {duration:?} elapsed.");
            let delivered = role.affinities().contains(Affinity::MAIN)
                && events.send(PlatformEvent::CloseRequested).is_ok();
            if !delivered {
                token.cancel();
            }
        })
        .context("Failed to spawn the run timer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_role_from_positional_or_flag() {
        let cli = Cli::parse_from(["strata-runtime", "dedicated"]);
        assert_eq!(cli.role(), Role::Server);

        let cli = Cli::parse_from(["strata-runtime", "--role", "host", "--frames", "10"]);
        assert_eq!(cli.role(), Role::Both);
        assert_eq!(cli.frames, Some(10));

        let cli = Cli::parse_from(["strata-runtime"]);
        assert_eq!(cli.role(), Role::Client);
    }

    #[test]
    fn test_unknown_role_falls_back_to_client() {
        let cli = Cli::parse_from(["strata-runtime", "spectator"]);
        assert_eq!(cli.role(), Role::Client);
    }

    #[test]
    fn test_both_role_spellings_conflict() {
        let parsed = Cli::try_parse_from(["strata-runtime", "client", "--role", "server"]);
        assert!(parsed.is_err());
    }
}
