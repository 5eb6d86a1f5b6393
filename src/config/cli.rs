use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the memfirst binary.
#[derive(Debug, Parser)]
#[command(
    name = "memfirst",
    version,
    about = "Inspect and maintain a memfirst shared cache"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "MEMFIRST_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the value stored under a key.
    Get(KeyArgs),
    /// Store a value under a key.
    Set(SetArgs),
    /// Remove a key from the cache.
    Delete(KeyArgs),
    /// Remove every entry from the cache.
    Clear,
    /// Delete entries whose lifetime has passed.
    #[command(name = "purge-expired")]
    PurgeExpired,
    /// Apply the embedded database migrations.
    Migrate,
}

#[derive(Debug, Args, Clone)]
pub struct KeyArgs {
    /// Cache key.
    #[arg(value_name = "KEY")]
    pub key: String,
}

#[derive(Debug, Args, Clone)]
pub struct SetArgs {
    /// Cache key.
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Value to store, taken verbatim.
    #[arg(value_name = "VALUE")]
    pub value: String,

    /// Expire the entry after this many seconds.
    #[arg(long = "ttl-seconds", value_name = "SECONDS")]
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(
        long = "database-max-connections",
        value_name = "COUNT",
        global = true
    )]
    pub database_max_connections: Option<u32>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}
