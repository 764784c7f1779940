use crate::models::resize::OutputFormat;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt::Display, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub redis_url: String,
    pub master_addr: String,
    pub default_width: u32,
    pub output_format: OutputFormat,
    pub quality: u8,
    pub blur: f32,
    pub upstream_timeout: Duration,
    pub location_ttl: Option<Duration>,
    pub max_concurrent_transforms: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "On-demand image resizing gateway")]
pub struct Args {
    /// Host to bind to (overrides IMAGE_GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides IMAGE_GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Redis URL of the id store (overrides IMAGE_GATEWAY_REDIS_URL)
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Shard master address (overrides IMAGE_GATEWAY_MASTER_ADDR)
    #[arg(long)]
    pub master_addr: Option<String>,

    /// Width used when `w` is absent (overrides IMAGE_GATEWAY_DEFAULT_WIDTH)
    #[arg(long)]
    pub default_width: Option<u32>,

    /// Output format: webp, jpeg or png (overrides IMAGE_GATEWAY_OUTPUT_FORMAT)
    #[arg(long)]
    pub output_format: Option<String>,

    /// Output quality 1-100 (overrides IMAGE_GATEWAY_QUALITY)
    #[arg(long)]
    pub quality: Option<u8>,

    /// Resample blur factor, < 1 sharpens (overrides IMAGE_GATEWAY_BLUR)
    #[arg(long)]
    pub blur: Option<f32>,

    /// Timeout in seconds for every upstream call (overrides IMAGE_GATEWAY_UPSTREAM_TIMEOUT_SECS)
    #[arg(long)]
    pub upstream_timeout_secs: Option<u64>,

    /// Expire cached shard locations after this many seconds (overrides IMAGE_GATEWAY_LOCATION_TTL_SECS)
    #[arg(long)]
    pub location_ttl_secs: Option<u64>,

    /// Upper bound on transforms running at once (overrides IMAGE_GATEWAY_MAX_CONCURRENT_TRANSFORMS)
    #[arg(long)]
    pub max_concurrent_transforms: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Merge already-parsed CLI args over the environment.
    pub fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("IMAGE_GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse::<u16>("IMAGE_GATEWAY_PORT")?.unwrap_or(8080);
        let env_redis = env::var("IMAGE_GATEWAY_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let env_master =
            env::var("IMAGE_GATEWAY_MASTER_ADDR").unwrap_or_else(|_| "127.0.0.1:9333".into());
        let env_width = env_parse::<u32>("IMAGE_GATEWAY_DEFAULT_WIDTH")?.unwrap_or(1000);
        let env_format =
            env::var("IMAGE_GATEWAY_OUTPUT_FORMAT").unwrap_or_else(|_| "webp".into());
        let env_quality = env_parse::<u8>("IMAGE_GATEWAY_QUALITY")?.unwrap_or(95);
        let env_blur = env_parse::<f32>("IMAGE_GATEWAY_BLUR")?.unwrap_or(0.8);
        let env_timeout = env_parse::<u64>("IMAGE_GATEWAY_UPSTREAM_TIMEOUT_SECS")?.unwrap_or(5);
        let env_ttl = env_parse::<u64>("IMAGE_GATEWAY_LOCATION_TTL_SECS")?;
        let env_permits = env_parse::<usize>("IMAGE_GATEWAY_MAX_CONCURRENT_TRANSFORMS")?
            .unwrap_or_else(default_parallelism);

        // --- Merge ---
        let format_name = args.output_format.unwrap_or(env_format);
        let output_format = format_name
            .parse::<OutputFormat>()
            .map_err(|err| anyhow::anyhow!(err))
            .with_context(|| format!("parsing output format `{}`", format_name))?;

        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            redis_url: args.redis_url.unwrap_or(env_redis),
            master_addr: args.master_addr.unwrap_or(env_master),
            default_width: args.default_width.unwrap_or(env_width),
            output_format,
            quality: args.quality.unwrap_or(env_quality),
            blur: args.blur.unwrap_or(env_blur),
            upstream_timeout: Duration::from_secs(
                args.upstream_timeout_secs.unwrap_or(env_timeout),
            ),
            location_ttl: args.location_ttl_secs.or(env_ttl).map(Duration::from_secs),
            max_concurrent_transforms: args.max_concurrent_transforms.unwrap_or(env_permits),
        };
        cfg.validate()?;

        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.default_width == 0 {
            bail!("default width must be positive");
        }
        if !(1..=100).contains(&self.quality) {
            bail!("quality must be between 1 and 100, got {}", self.quality);
        }
        if !(self.blur.is_finite() && self.blur > 0.0) {
            bail!("blur must be a positive number, got {}", self.blur);
        }
        if self.upstream_timeout.is_zero() {
            bail!("upstream timeout must be at least one second");
        }
        if self.max_concurrent_transforms == 0 {
            bail!("max concurrent transforms must be at least 1");
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL of the shard master, with `http://` added when no scheme is given.
    pub fn master_url(&self) -> String {
        let addr = self.master_addr.trim_end_matches('/');
        if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{}", addr)
        }
    }
}

/// Read and parse an optional environment variable.
fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
