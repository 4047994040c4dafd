use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::{Parser, Subcommand};
use log::info;

use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::console::application::ConsoleApplication;
use crate::device::btle::BtleRadio;
use crate::device::permissions::DesktopPermissions;
use crate::device::session::ScanSession;
use crate::error::AppRunError;

pub mod config;
pub mod console;
pub mod device;
pub mod error;

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Scan for nearby Bluetooth Low Energy devices", long_about = None)]
pub struct Cli {
    /// Path to the config file. Defaults to <executable>.json if it exists, otherwise a file
    /// in the user's config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Scan once and print the devices that were found
    Scan {
        /// How long to scan, for example "10s" or "1m 30s". Defaults to the configured period.
        #[arg(long, value_parser = humantime::parse_duration)]
        duration: Option<Duration>,
    },
    /// Ask the operating system to turn bluetooth on
    Enable,
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Read commands (enable, scan, stop, list, quit) from standard input
    Interactive,
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info }
    }
}

pub fn init_logging(level: log::LevelFilter) {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

async fn init_config(config_io: &ConfigIO, force: bool) -> Result<(), AppRunError> {
    if !force && !config_io.is_empty()? {
        println!("{} already exists, use --force to overwrite it", config_io.path().to_string_lossy());
        return Ok(());
    }

    config_io.save(&Config::default()).await?;
    println!("Wrote default config to {}", config_io.path().to_string_lossy());
    Ok(())
}

pub async fn run(cli: Cli) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync(cli.config)?;

    // one instance at a time may drive the radio
    let mut locker = config_io.locker()?;
    let _guard = locker.lock()?;

    let command = cli.command.unwrap_or(CliCommand::Interactive);

    if let CliCommand::InitConfig { force } = command {
        return init_config(&config_io, force).await;
    }

    let config = config_io.read().await?;
    info!("Scan period {}, repeated start policy {:?}", humantime::format_duration(config.scan_period()), config.repeat_start);

    let radio = Arc::new(BtleRadio::new(config.service_filter.clone()));
    let permissions = Arc::new(DesktopPermissions::new(config.granted_permissions.iter().copied()));
    let session = ScanSession::new(radio, permissions, config.repeat_start);
    let (mut app, mut events) = ConsoleApplication::new(session, config.scan_period());

    match command {
        CliCommand::Scan { duration } => app.scan_once(&mut events, duration).await?,
        CliCommand::Enable => app.enable_once().await?,
        CliCommand::Interactive => app.run_interactive(&mut events).await?,
        // handled before the config is read
        CliCommand::InitConfig { .. } => {},
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_command() {
        let cli = Cli::parse_from(["ble-broadcast"]);

        assert_eq!(cli.command, None);
        assert_eq!(cli.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn scan_duration_uses_humantime() {
        let cli = Cli::parse_from(["ble-broadcast", "scan", "--duration", "1m 30s", "-v"]);

        assert_eq!(cli.command, Some(CliCommand::Scan { duration: Some(Duration::from_secs(90)) }));
        assert_eq!(cli.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn config_path_is_global() {
        let cli = Cli::parse_from(["ble-broadcast", "init-config", "--force", "--config", "/tmp/ble.json"]);

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/ble.json")));
        assert_eq!(cli.command, Some(CliCommand::InitConfig { force: true }));
    }
}
