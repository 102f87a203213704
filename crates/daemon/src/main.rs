// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pqd: the printq scheduler daemon.

use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pq_daemon::config::ServerConfig;
use pq_daemon::lifecycle::{self, StartupOptions};
use pq_daemon::sandbox::{describe, NoSandbox};

#[derive(Parser, Debug)]
#[command(name = "pqd", version, about = "printq scheduler")]
struct Args {
    /// Configuration file
    #[arg(short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run in the foreground
    #[arg(short = 'f')]
    foreground: bool,

    /// Run in the foreground, detached from the controlling terminal
    #[arg(short = 'F')]
    foreground_detached: bool,

    /// Launch on demand (listeners supplied by the service supervisor)
    #[arg(short = 'l')]
    on_demand: bool,

    /// File configuration (pq-files.conf)
    #[arg(short = 's', value_name = "FILE")]
    files_config: Option<PathBuf>,

    /// Test the configuration and exit
    #[arg(short = 't')]
    test_config: bool,

    /// Emit the active sandbox profile and exit
    #[arg(short = 'T')]
    emit_profile: bool,

    /// Disable sandboxing (test use only)
    #[arg(short = 'P')]
    no_sandbox: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let server_root = pq_daemon::env::server_root().unwrap_or_else(|| PathBuf::from("/etc/printq"));
    let conf = args
        .config
        .clone()
        .unwrap_or_else(|| server_root.join("pqd.conf"));
    let files_conf = args.files_config.clone().or_else(|| {
        let default = server_root.join("pq-files.conf");
        default.exists().then_some(default)
    });

    if args.test_config {
        return match ServerConfig::load(&conf, files_conf.as_deref()) {
            Ok(_) => {
                println!("{}: OK", conf.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("pqd: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if args.emit_profile {
        println!("{}", describe(&NoSandbox));
        return ExitCode::SUCCESS;
    }

    // Background mode: re-exec ourselves detached in a new session
    if !args.foreground && !args.foreground_detached {
        return daemonize(&conf, files_conf.as_deref(), &args);
    }

    init_logging(&conf, files_conf.as_deref(), args.foreground);

    let options = StartupOptions {
        on_demand: args.on_demand,
        no_sandbox: args.no_sandbox,
    };
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("pqd: could not start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(async {
        let startup = lifecycle::startup(&conf, files_conf.as_deref(), &options).await?;
        lifecycle::run(startup).await
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "startup failed");
            eprintln!("pqd: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Spawn the real daemon as a detached child in its own session.
fn daemonize(conf: &std::path::Path, files_conf: Option<&std::path::Path>, args: &Args) -> ExitCode {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            eprintln!("pqd: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut cmd = std::process::Command::new(exe);
    cmd.arg("-F").arg("-c").arg(conf);
    if let Some(files) = files_conf {
        cmd.arg("-s").arg(files);
    }
    if args.on_demand {
        cmd.arg("-l");
    }
    if args.no_sandbox {
        cmd.arg("-P");
    }
    cmd.stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .process_group(0);
    match cmd.spawn() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pqd: could not daemonize: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Foreground logs to stderr; detached mode appends to the error log.
fn init_logging(conf: &std::path::Path, files_conf: Option<&std::path::Path>, foreground: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if foreground {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        return;
    }
    let log_path = ServerConfig::load(conf, files_conf)
        .map(|c| c.error_log)
        .unwrap_or_else(|_| PathBuf::from("/var/log/printq/error_log"));
    let dir = log_path.parent().unwrap_or(std::path::Path::new("/tmp"));
    let file = log_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "error_log".to_string());
    let _ = std::fs::create_dir_all(dir);
    let appender = tracing_appender::rolling::never(dir, file);
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(appender).with_ansi(false).init();
}
