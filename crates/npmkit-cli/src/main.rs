//! npmkit CLI
//!
//! Command-line front end for running npm install/update

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::Result;
use npmkit_pkg::{
    ExitStatusPolicy, NpmManager, NpmOptions, OptionValue, PackageManager, ProcessResult,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, LogConfig, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "npmkit", version)]
#[command(about = "Run npm install/update with typed options", long_about = None)]
struct Cli {
    /// Directory to run npm in
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    /// Configuration file (overrides NPMKIT_CONFIG and the default locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat a non-zero npm exit status as an error
    #[arg(long, global = true)]
    strict_exit: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install dependencies
    Install {
        /// Packages to install (everything in package.json when empty)
        dependencies: Vec<String>,

        /// Record under `dependencies`
        #[arg(long)]
        save: bool,

        /// Record under `devDependencies`
        #[arg(long)]
        save_dev: bool,

        /// Install prefix
        #[arg(long)]
        prefix: Option<String>,

        #[command(flatten)]
        flags: FlagArgs,
    },
    /// Update installed packages
    Update {
        #[command(flatten)]
        flags: FlagArgs,
    },
    /// Check that npm is installed and print its version
    Check {
        /// Print the version as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Flags shared by `install` and `update`
#[derive(Args, Debug, Default)]
struct FlagArgs {
    /// Skip dev dependencies
    #[arg(long, overrides_with = "no_production")]
    production: bool,

    /// Include dev dependencies, even if the config sets `production`
    #[arg(long, overrides_with = "production")]
    no_production: bool,

    /// npm log level
    #[arg(long)]
    loglevel: Option<String>,

    /// Extra npm flag, passed through as --KEY=VALUE (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    set: Vec<(String, OptionValue)>,
}

impl FlagArgs {
    /// `--production`/`--no-production`, whichever came last
    fn production(&self) -> Option<bool> {
        if self.production {
            Some(true)
        } else if self.no_production {
            Some(false)
        } else {
            None
        }
    }
}

/// Parse `key=value`, typing `true`/`false` and integers
fn parse_key_val(s: &str) -> Result<(String, OptionValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;

    let key = key.trim_start_matches("--");
    if key.is_empty() {
        return Err(format!("empty option name in `{s}`"));
    }

    let value = match value {
        "true" => OptionValue::Bool(true),
        "false" => OptionValue::Bool(false),
        other => other
            .parse::<i64>()
            .map_or_else(|_| OptionValue::from(other), OptionValue::Int),
    };

    Ok((key.to_string(), value))
}

/// Merge config defaults with command-line flags
fn npm_options(config: &Config, flags: FlagArgs) -> NpmOptions {
    let production = flags.production().unwrap_or(config.npm.production);
    let mut options = NpmOptions::new().production(production);

    if let Some(level) = flags.loglevel.or_else(|| config.npm.loglevel.clone()) {
        options = options.loglevel(level);
    }
    for (key, value) in &config.npm.options {
        options = options.option(key.clone(), value.clone());
    }
    for (key, value) in flags.set {
        options = options.option(key, value);
    }

    options
}

fn build_manager(cli: &Cli, config: &Config) -> NpmManager {
    let exit_policy = if cli.strict_exit {
        ExitStatusPolicy::Fail
    } else {
        config.npm.effective_exit_policy()
    };

    let mut builder = NpmManager::builder()
        .program(config.npm.program.clone())
        .exit_policy(exit_policy);

    if let Some(dir) = cli.cwd.clone().or_else(|| config.npm.working_dir.clone()) {
        builder = builder.working_dir(dir);
    }

    builder.build()
}

fn init_tracing(log: &LogConfig, verbose: u8) {
    let level = match verbose {
        0 => log.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match log.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::locate);
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    init_tracing(&config.log, cli.verbose);
    match &config_path {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => warn!("no config file found, using defaults"),
    }

    let manager = build_manager(&cli, &config);

    match cli.command {
        Commands::Install {
            dependencies,
            save,
            save_dev,
            prefix,
            flags,
        } => {
            let mut options = npm_options(&config, flags)
                .with_dependencies(dependencies)
                .save(save)
                .save_dev(save_dev);
            if let Some(prefix) = prefix {
                options = options.prefix(prefix);
            }

            let result = manager.install(&options).await?;
            report("install", &result);
        }
        Commands::Update { flags } => {
            let options = npm_options(&config, flags);
            let result = manager.update(&options).await?;
            report("update", &result);
        }
        Commands::Check { json } => {
            let version = manager.check_tool().await?;
            if json {
                println!("{}", serde_json::to_string(&version)?);
            } else {
                println!("{} {version}", config.npm.program);
            }
        }
    }

    Ok(())
}

fn report(command: &str, result: &ProcessResult) {
    if result.success() {
        info!(command, duration = ?result.duration, "done");
    } else {
        warn!(command, status = result.status, "npm exited non-zero");
    }
}
