use clap::Parser;
use std::path::PathBuf;

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "subscout",
    version = LONG_VERSION,
    about = "Subdomain discovery via certificate transparency and DNS brute-forcing",
    long_about = "subscout finds subdomains of a target by querying crt.sh certificate transparency logs\nand by resolving wordlist candidates against DNS with a bounded worker pool."
)]
pub struct Args {
    /// Target domain (e.g. example.com)
    #[arg(short = 'd', long = "domain", value_name = "DOMAIN")]
    pub domain: String,

    /// Wordlist for DNS brute-forcing, one label per line
    #[arg(short = 'w', long = "wordlist", value_name = "FILE")]
    pub wordlist: Option<PathBuf>,

    /// Number of concurrent DNS workers [default: 10]
    #[arg(short = 't', long = "threads", value_name = "N")]
    pub threads: Option<usize>,

    /// DNS resolution timeout in seconds [default: 2]
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<String>,

    /// crt.sh request timeout in seconds [default: 15]
    #[arg(long = "passive-timeout", value_name = "SECONDS")]
    pub passive_timeout: Option<String>,

    /// Also save results to this file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Output a JSON report instead of plain names
    #[arg(long = "json")]
    pub json: bool,

    /// Only query certificate transparency logs
    #[arg(long = "passive-only")]
    pub passive_only: bool,

    /// Only brute-force DNS (requires --wordlist)
    #[arg(long = "active-only")]
    pub active_only: bool,

    /// Nameservers to use instead of the system resolver (comma-separated ip[:port])
    #[arg(short = 'r', long = "resolvers", value_delimiter = ',')]
    pub resolvers: Option<Vec<String>>,

    /// Maximum DNS queries per second
    #[arg(long = "rate-limit", value_name = "QPS")]
    pub rate_limit: Option<u32>,

    /// Discard brute-force hits that only match wildcard DNS records
    #[arg(long = "filter-wildcards")]
    pub filter_wildcards: bool,

    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<PathBuf>,

    /// Silent mode (only output subdomains)
    #[arg(long = "silent")]
    pub silent: bool,

    /// Verbose mode
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Args {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else if self.silent {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }
}
