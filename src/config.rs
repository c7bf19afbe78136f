use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

use crate::services::object_store::WaitPolicy;

const SUPPORTED_REGIONS: [&str; 16] = [
    "local",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "ap-southeast-1",
    "ap-northeast-1",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-northeast-2",
    "ap-northeast-3",
    "me-south-1",
];

/// Centralized application configuration.
/// Combines environment variables (optionally from `.env`) and CLI arguments.
/// Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub bucket: String,
    pub region: String,
    pub storage_dir: String,
    pub database_url: String,
    pub delete_wait: WaitPolicy,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Author-owned image upload service")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Bucket holding the images (overrides IMAGE_STORE_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Bucket region (overrides IMAGE_STORE_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Directory where object payloads are stored (overrides IMAGE_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Metadata database URL (overrides IMAGE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Checks made after a delete before giving up on confirmation
    /// (overrides IMAGE_STORE_DELETE_WAIT_ATTEMPTS)
    #[arg(long)]
    pub delete_wait_attempts: Option<u32>,

    /// Pause between confirmation checks, in milliseconds
    /// (overrides IMAGE_STORE_DELETE_WAIT_DELAY_MS)
    #[arg(long)]
    pub delete_wait_delay_ms: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse `.env`, environment variables and CLI args into AppConfig and
    /// the migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err).context("loading .env file");
            }
        }
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |name| env::var(name).ok())?;
        Ok((cfg, migrate))
    }

    /// Merge CLI args over values looked up through `env`.
    pub fn resolve(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bucket = match args.bucket.or_else(|| env("IMAGE_STORE_BUCKET")) {
            Some(bucket) if !bucket.trim().is_empty() => bucket,
            _ => bail!("no bucket configured; set IMAGE_STORE_BUCKET or pass --bucket"),
        };

        let region = args
            .region
            .or_else(|| env("IMAGE_STORE_REGION"))
            .unwrap_or_else(|| "local".into())
            .to_lowercase();
        if !SUPPORTED_REGIONS.contains(&region.as_str()) {
            bail!("region `{}` is not supported", region);
        }

        let defaults = WaitPolicy::default();
        let attempts = match args.delete_wait_attempts {
            Some(v) => v,
            None => parse_env(&env, "IMAGE_STORE_DELETE_WAIT_ATTEMPTS")?
                .unwrap_or(defaults.max_attempts),
        };
        if attempts == 0 {
            bail!("delete wait attempts must be at least 1");
        }
        let delay = match args.delete_wait_delay_ms {
            Some(ms) => Duration::from_millis(ms),
            None => parse_env::<u64>(&env, "IMAGE_STORE_DELETE_WAIT_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay),
        };

        Ok(Self {
            host: args
                .host
                .or_else(|| env("IMAGE_STORE_HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: match args.port {
                Some(port) => port,
                None => parse_env(&env, "IMAGE_STORE_PORT")?.unwrap_or(8080),
            },
            bucket,
            region,
            storage_dir: args
                .storage_dir
                .or_else(|| env("IMAGE_STORE_STORAGE_DIR"))
                .unwrap_or_else(|| "./data/objects".into()),
            database_url: args
                .database_url
                .or_else(|| env("IMAGE_STORE_DATABASE_URL"))
                .unwrap_or_else(|| "sqlite://./data/meta/image_store.db".into()),
            delete_wait: WaitPolicy {
                max_attempts: attempts,
                delay,
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(name)
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", name, value))
        })
        .transpose()
}
