use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

const CHECK_IN_TIME_FORMAT: &str = "%H:%M";

#[derive(Parser, Debug)]
#[command(name = "hotell", about = "Hotel room booking site")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, env = "HOTELL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "HOTELL_HOST", global = true)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "HOTELL_PORT", global = true)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long, env = "HOTELL_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH", global = true)]
    pub database_path: Option<PathBuf>,

    /// Cloud storage bucket; selects the GCS backend when set
    #[arg(long, env = "GS_BUCKET_NAME", global = true)]
    pub bucket: Option<String>,

    /// Bearer token for the cloud storage API
    #[arg(long, env = "GS_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub access_token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the web server (default)
    Serve,
    /// Create a staff + superuser account
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "HOTELL_SUPERUSER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Insert demo amenities and rooms
    Seed,
    /// Copy a directory of room images into the configured storage backend
    UploadMedia {
        /// Local directory to upload
        dir: PathBuf,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub booking: BookingConfig,
    pub mail: MailConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Local,
    Gcs,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageKind,
    /// Root of the local media directory
    pub path: Option<PathBuf>,
    pub bucket: Option<String>,
    pub access_token: Option<String>,
    /// Overrides the public URL prefix of stored objects
    pub public_base_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BookingConfig {
    /// Time of day a stay starts, "HH:MM"
    pub check_in_time: String,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailKind {
    #[default]
    Console,
    Smtp,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MailConfig {
    pub backend: MailKind,
    pub from: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "hotell_session".to_string(),
            session_hours: 336,
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            check_in_time: "15:00".to_string(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            backend: MailKind::Console,
            from: "bookings@hotell.local".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
        }
    }
}

impl BookingConfig {
    pub fn check_in_time(&self) -> NaiveTime {
        NaiveTime::parse_from_str(&self.check_in_time, CHECK_IN_TIME_FORMAT)
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(15, 0, 0).unwrap_or_default())
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI and environment overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref path) = cli.database_path {
            config.database.path = Some(path.clone());
        }
        if let Some(ref bucket) = cli.bucket {
            config.storage.backend = StorageKind::Gcs;
            config.storage.bucket = Some(bucket.clone());
        }
        if let Some(ref token) = cli.access_token {
            config.storage.access_token = Some(token.clone());
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("hotell.db"));
        }
        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("media"));
        }

        NaiveTime::parse_from_str(&config.booking.check_in_time, CHECK_IN_TIME_FORMAT).map_err(
            |e| {
                anyhow::anyhow!(
                    "booking.check_in_time must be HH:MM, got {:?}: {}",
                    config.booking.check_in_time,
                    e
                )
            },
        )?;
        if config.storage.backend == StorageKind::Gcs && config.storage.bucket.is_none() {
            anyhow::bail!("storage.backend = \"gcs\" requires storage.bucket");
        }
        if config.mail.backend == MailKind::Smtp && config.mail.smtp_host.is_none() {
            anyhow::bail!("mail.backend = \"smtp\" requires mail.smtp_host");
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".hotell")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("hotell.db"))
    }

    pub fn media_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("media"))
    }
}
