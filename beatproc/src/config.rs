//! beatproc configuration
//!
//! Command-line flags with environment fallbacks, flattened into a plain
//! [`Config`] so the library can be driven without clap.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Command-line arguments for beatproc
#[derive(Parser, Debug, Clone)]
#[command(name = "beatproc")]
#[command(about = "Beat processor: stem packaging and voice-tag watermarking")]
#[command(version)]
pub struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0", env = "BEATPROC_HOST")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value = "5000", env = "PORT")]
    pub port: u16,

    /// Storage bucket receiving archives and watermarked audio
    #[arg(long, env = "FIREBASE_BUCKET")]
    pub bucket: Option<String>,

    /// Webhook notified when a separation finishes or fails
    #[arg(long, env = "STEMS_CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// Service-account JSON key used to authenticate uploads
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Storage emulator host; uploads go there unauthenticated
    #[arg(long, env = "STORAGE_EMULATOR_HOST")]
    pub storage_emulator_host: Option<String>,

    /// ffmpeg binary used to mix the tag in
    #[arg(long, default_value = "ffmpeg", env = "FFMPEG_PATH")]
    pub ffmpeg: PathBuf,

    /// ffprobe binary used to measure the source duration
    #[arg(long, default_value = "ffprobe", env = "FFPROBE_PATH")]
    pub ffprobe: PathBuf,

    /// Seconds between tag insertions
    #[arg(long, default_value_t = 15, env = "TAG_INTERVAL_SECS")]
    pub tag_interval_secs: u64,

    /// Gain applied to the tag before mixing, in dB
    #[arg(long, default_value_t = -6.0, env = "TAG_GAIN_DB", allow_negative_numbers = true)]
    pub tag_gain_db: f64,

    /// Directory for per-request scratch space (defaults to the system temp dir)
    #[arg(long, env = "SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Answer every error with HTTP 200, as older clients expect
    #[arg(long, env = "LEGACY_ERROR_STATUS")]
    pub legacy_status: bool,
}

/// Object storage settings
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub credentials: Option<PathBuf>,
    pub emulator_host: Option<String>,
}

/// Watermark tool binding and mix parameters
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub interval: Duration,
    pub gain_db: f64,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            interval: Duration::from_secs(15),
            gain_db: -6.0,
        }
    }
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub storage: StorageConfig,
    pub callback_url: Option<String>,
    pub watermark: WatermarkConfig,
    pub scratch_root: Option<PathBuf>,
    pub legacy_status: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5000),
            storage: StorageConfig::default(),
            callback_url: None,
            watermark: WatermarkConfig::default(),
            scratch_root: None,
            legacy_status: false,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            bind_addr: SocketAddr::new(args.host, args.port),
            storage: StorageConfig {
                bucket: non_empty(args.bucket),
                credentials: args.credentials.filter(|p| !p.as_os_str().is_empty()),
                emulator_host: non_empty(args.storage_emulator_host),
            },
            callback_url: non_empty(args.callback_url),
            watermark: WatermarkConfig {
                ffmpeg: args.ffmpeg,
                ffprobe: args.ffprobe,
                // A zero interval would never advance
                interval: Duration::from_secs(args.tag_interval_secs.max(1)),
                gain_db: args.tag_gain_db,
            },
            scratch_root: args.scratch_dir,
            legacy_status: args.legacy_status,
        }
    }
}

/// Unset and empty environment variables mean the same thing
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
