use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use std::process;
use std::sync::Arc;
use subscout::config::build_scan_config;
use subscout::output::OutputManager;
use subscout::shutdown::Shutdown;
use subscout::{Args, ScanEngine};

const BANNER: &str = r#"
           _
 ___ _   _| |__  ___  ___ ___  _   _| |_
/ __| | | | '_ \/ __|/ __/ _ \| | | | __|
\__ \ |_| | |_) \__ \ (_| (_) | |_| | |_
|___/\__,_|_.__/|___/\___\___/ \__,_|\__|

   Certificate logs + DNS brute-force
"#;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .init();

    if !args.silent {
        eprintln!("{}", BANNER);
    }

    let config = match build_scan_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let engine = ScanEngine::new(config)?;

    let shutdown = Arc::new(Shutdown::new());
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping workers and keeping partial results");
            signal.trigger();
        }
    });

    let report = engine.run(shutdown.subscribe()).await?;

    if report.subdomains.is_empty() {
        info!("No subdomains found for {}", report.domain);
    } else {
        info!("Found {} unique subdomain(s)", report.stats.unique_subdomains);
    }

    let output = OutputManager::new(engine.config().output.clone());
    if let Err(e) = output.write_report(&report) {
        error!("{}", e);
        process::exit(1);
    }

    info!("Scan completed in {:.2}s", report.stats.duration.as_secs_f64());

    if report.stats.interrupted {
        process::exit(1);
    }

    Ok(())
}
