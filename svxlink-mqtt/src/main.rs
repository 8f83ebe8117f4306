//! SvxLink to MQTT bridge
//!
//! Follows the SvxLink log and publishes the current talker, talk group and
//! TX/RX state to an MQTT topic whenever it changes. It uses the
//! svxlink-status library for following, parsing and tracking, and adds:
//! - Configuration file and command line overrides
//! - The MQTT connection
//! - Signal handling and a clean disconnect on shutdown

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use svxlink_status::{
    EventParser, LogFollower, Pipeline, QoS, Shutdown, StatusPublisher, StatusTracker,
};

mod config;
mod mqtt;

use config::AppConfig;
use mqtt::MqttPublisher;

/// SvxLink to MQTT - publish repeater talker and TX/RX state
#[derive(Parser, Debug)]
#[command(name = "svx2mqtt")]
#[command(about = "Publish SvxLink talker, talk group and TX/RX state to MQTT", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SvxLink log file to follow
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// MQTT broker host
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// MQTT broker port
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// MQTT client identifier
    #[arg(long, value_name = "ID")]
    client_id: Option<String>,

    /// Topic the status is published to
    #[arg(long, value_name = "TOPIC")]
    topic: Option<String>,

    /// MQTT QoS (0, 1 or 2; other values fall back to 0)
    #[arg(long, value_name = "LEVEL", allow_negative_numbers = true)]
    qos: Option<i64>,

    /// Publish with the retain flag set
    #[arg(long)]
    retain: bool,

    /// Match log lines ignoring case
    #[arg(long)]
    case_insensitive: bool,

    /// Print the resolved configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Apply command line overrides on top of the file configuration
    fn apply(&self, config: &mut AppConfig) {
        if let Some(log) = &self.log {
            config.input.path = log.clone();
        }
        if let Some(host) = &self.host {
            config.mqtt.host = host.clone();
        }
        if let Some(port) = self.port {
            config.mqtt.port = port;
        }
        if let Some(client_id) = &self.client_id {
            config.mqtt.client_id = client_id.clone();
        }
        if let Some(topic) = &self.topic {
            config.mqtt.topic = topic.clone();
        }
        if let Some(qos) = self.qos {
            config.mqtt.qos = QoS::coerce(qos);
        }
        if self.retain {
            config.mqtt.retain = true;
        }
        if self.case_insensitive {
            config.sources.case_insensitive = true;
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    let config = resolve_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    log::info!("svx2mqtt v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using status library v{}", svxlink_status::VERSION);

    run(&config)
}

/// Load the configuration file (if any) and apply command line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    args.apply(&mut config);
    Ok(config)
}

/// Follow the log until interrupted
fn run(config: &AppConfig) -> Result<()> {
    println!(
        "Following {} -> MQTT {}:{} topic {} QoS={}",
        config.input.path.display(),
        config.mqtt.host,
        config.mqtt.port,
        config.mqtt.topic,
        config.mqtt.qos
    );

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            log::info!("Shutdown requested");
            shutdown.trigger();
        })
        .context("Failed to install signal handler")?;
    }

    let parser = EventParser::new(&config.sources).context("Invalid source configuration")?;
    let tracker = StatusTracker::new(&config.status);
    let mqtt = MqttPublisher::connect(&config.mqtt)?;
    let publisher = StatusPublisher::new(mqtt, config.mqtt.publish_options());

    let follower = LogFollower::new(&config.input.path, config.input.poll_interval(), shutdown);
    let mut pipeline = Pipeline::new(parser, tracker, publisher);

    let result = pipeline.run(follower);
    let stats = pipeline.stats();
    pipeline.into_publisher().into_inner().disconnect();

    log::info!(
        "Stopped after {} lines: {} events, {} published, {} failed",
        stats.lines,
        stats.events,
        stats.published,
        stats.failed
    );

    result.context("Log follower failed")?;
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
