use std::{process::ExitCode, sync::Arc, time::Duration};

use memfirst::{
    cache::{CacheConfig, CacheError, CacheKey, MemoryFirstCache},
    config,
    infra::{error::InfraError, postgres::PostgresBackingStore, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            report_application_error(&error);
            ExitCode::FAILURE
        }
    }
}

fn report_application_error(error: &InfraError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<ExitCode, InfraError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        InfraError::configuration(format!("failed to load configuration: {err}"))
    })?;

    telemetry::init(&settings.logging)?;

    let url = settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database.url is required"))?;
    let pool =
        PostgresBackingStore::connect(url, settings.database.max_connections.get()).await?;

    let backing = Arc::new(PostgresBackingStore::new(pool));
    let cache =
        MemoryFirstCache::with_backing(backing.clone(), CacheConfig::from(&settings.cache));

    match cli_args.command {
        config::Command::Get(args) => {
            let key = CacheKey::new(args.key)?;
            match cache.get(&key).await? {
                Some(value) => {
                    println!("{}", String::from_utf8_lossy(&value));
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("not found: {key}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        config::Command::Set(args) => {
            let key = CacheKey::new(args.key)?;
            match args.ttl_seconds {
                Some(seconds) => {
                    cache
                        .set_with_ttl(&key, args.value, Duration::from_secs(seconds))
                        .await?
                }
                None => cache.set(&key, args.value).await?,
            }
            Ok(ExitCode::SUCCESS)
        }
        config::Command::Delete(args) => {
            let key = CacheKey::new(args.key)?;
            cache.delete(&key).await?;
            Ok(ExitCode::SUCCESS)
        }
        config::Command::Clear => {
            cache.clear().await?;
            Ok(ExitCode::SUCCESS)
        }
        config::Command::PurgeExpired => {
            let purged = backing.purge_expired().await.map_err(CacheError::from)?;
            println!("{purged}");
            Ok(ExitCode::SUCCESS)
        }
        config::Command::Migrate => {
            PostgresBackingStore::run_migrations(backing.pool()).await?;
            info!("migrations applied");
            Ok(ExitCode::SUCCESS)
        }
    }
}
