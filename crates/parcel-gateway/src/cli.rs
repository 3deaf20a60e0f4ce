use clap::{Parser, ValueEnum};
use parcel_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "PARCEL_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "PARCEL_PUBLIC_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "PARCEL_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "PARCEL_MYSQL_DSN";
pub const MYSQL_MAX_CONNECTIONS_ENV: &str = "PARCEL_MYSQL_MAX_CONNECTIONS";
pub const BLOB_BACKEND_ENV: &str = "PARCEL_BLOB_BACKEND";
pub const BLOB_DIR_ENV: &str = "PARCEL_BLOB_DIR";
pub const DEFAULT_STORAGE_BYTES_ENV: &str = "PARCEL_DEFAULT_STORAGE_BYTES";
pub const DEFAULT_MAX_FILES_ENV: &str = "PARCEL_DEFAULT_MAX_FILES";
pub const MAX_UPLOAD_BYTES_ENV: &str = "PARCEL_MAX_UPLOAD_BYTES";
pub const REAP_INTERVAL_ENV: &str = "PARCEL_REAP_INTERVAL_SECS";
pub const LOG_RETENTION_ENV: &str = "PARCEL_LOG_RETENTION_DAYS";
pub const REQUEST_TIMEOUT_ENV: &str = "PARCEL_REQUEST_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "PARCEL_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "PARCEL_OTLP_ENDPOINT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlobBackendArg {
    #[value(name = "memory")]
    Memory,
    #[value(name = "fs")]
    Fs,
}

impl Display for BlobBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BlobBackendArg::Memory => write!(f, "memory"),
            BlobBackendArg::Fs => write!(f, "fs"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "parcel-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(long, env = PUBLIC_BASE_URL_ENV, default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = MYSQL_MAX_CONNECTIONS_ENV, default_value_t = 10)]
    pub mysql_max_connections: u32,

    #[arg(
        long,
        env = BLOB_BACKEND_ENV,
        value_enum,
        default_value_t = BlobBackendArg::Memory
    )]
    pub blob: BlobBackendArg,

    #[arg(long, env = BLOB_DIR_ENV, required_if_eq("blob", "fs"))]
    pub blob_dir: Option<PathBuf>,

    #[arg(long, env = DEFAULT_STORAGE_BYTES_ENV, default_value_t = 10 * 1024 * 1024 * 1024)]
    pub default_storage_bytes: u64,

    #[arg(long, env = DEFAULT_MAX_FILES_ENV, default_value_t = 10_000)]
    pub default_max_files: u64,

    #[arg(long, env = MAX_UPLOAD_BYTES_ENV, default_value_t = 100 * 1024 * 1024)]
    pub max_upload_bytes: u64,

    #[arg(long, env = REAP_INTERVAL_ENV, default_value_t = 300)]
    pub reap_interval_secs: u64,

    /// `0` keeps access log rows forever.
    #[arg(long, env = LOG_RETENTION_ENV, default_value_t = 30)]
    pub log_retention_days: u64,

    #[arg(long, env = REQUEST_TIMEOUT_ENV, default_value_t = 30)]
    pub request_timeout_secs: u64,

    #[arg(long, env = LOG_FORMAT_ENV, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = CLI::try_parse_from(["parcel-gateway"]).unwrap();

        assert_eq!(cli.listen_addr.to_string(), DEFAULT_LISTEN_ADDR);
        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert_eq!(cli.blob, BlobBackendArg::Memory);
        assert_eq!(cli.default_storage_bytes, 10_737_418_240);
        assert_eq!(cli.max_upload_bytes, 104_857_600);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn mysql_requires_a_dsn() {
        assert!(CLI::try_parse_from(["parcel-gateway", "--storage", "mysql"]).is_err());

        let cli = CLI::try_parse_from([
            "parcel-gateway",
            "--storage",
            "mysql",
            "--mysql-dsn",
            "mysql://parcel@localhost/parcel",
        ])
        .unwrap();
        assert_eq!(cli.mysql_dsn.as_deref(), Some("mysql://parcel@localhost/parcel"));
    }

    #[test]
    fn fs_blobs_require_a_directory() {
        assert!(CLI::try_parse_from(["parcel-gateway", "--blob", "fs"]).is_err());
        assert!(
            CLI::try_parse_from(["parcel-gateway", "--blob", "fs", "--blob-dir", "/tmp/parcel"])
                .is_ok()
        );
    }

    #[test]
    fn parses_log_format() {
        let cli = CLI::try_parse_from(["parcel-gateway", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
