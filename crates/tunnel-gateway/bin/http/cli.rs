use clap::builder::TypedValueParser;
use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "TUNNEL_SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "TUNNEL_BASE_URL";
pub const SHORT_CODE_LENGTH_ENV: &str = "TUNNEL_LINK_LEN";
pub const STORAGE_BACKEND_ENV: &str = "TUNNEL_STORAGE_BACKEND";
pub const FILE_STORAGE_PATH_ENV: &str = "TUNNEL_FILE_STORAGE_PATH";
pub const MYSQL_DSN_ENV: &str = "TUNNEL_MYSQL_DSN";
pub const LOG_FORMAT_ENV: &str = "TUNNEL_LOG_FORMAT";
pub const DELETE_MAX_ATTEMPTS_ENV: &str = "TUNNEL_DELETE_MAX_ATTEMPTS";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "file")]
    File,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "tunnel-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Prefix of every short link handed out.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = SHORT_CODE_LENGTH_ENV,
        default_value_t = tunnel_generator::DEFAULT_LENGTH,
        value_parser = clap::value_parser!(u16).range(3..=32).map(usize::from),
    )]
    pub short_code_length: usize,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = FILE_STORAGE_PATH_ENV, required_if_eq("storage", "file"))]
    pub file_storage_path: Option<PathBuf>,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Attempts per background deletion before it is dropped.
    #[arg(
        long,
        env = DELETE_MAX_ATTEMPTS_ENV,
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub delete_max_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = CLI::try_parse_from(["gateway"]).unwrap();
        assert_eq!(cli.listen_addr, DEFAULT_LISTEN_ADDR.parse().unwrap());
        assert_eq!(cli.base_url, DEFAULT_BASE_URL);
        assert_eq!(cli.short_code_length, 8);
        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert_eq!(cli.delete_max_attempts, 3);
    }

    #[test]
    fn backend_specific_settings_are_required() {
        assert!(CLI::try_parse_from(["gateway", "--storage", "file"]).is_err());
        assert!(CLI::try_parse_from(["gateway", "--storage", "mysql"]).is_err());

        let cli = CLI::try_parse_from([
            "gateway",
            "--storage",
            "file",
            "--file-storage-path",
            "/tmp/tunnel.log",
        ])
        .unwrap();
        assert_eq!(cli.storage, StorageBackendArg::File);
    }

    #[test]
    fn rejects_out_of_range_lengths() {
        assert!(CLI::try_parse_from(["gateway", "--short-code-length", "2"]).is_err());
        assert!(CLI::try_parse_from(["gateway", "--delete-max-attempts", "0"]).is_err());
    }
}
