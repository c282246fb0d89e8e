use crate::aggregate::aggregate;
use crate::bruteforce::{BruteForceOutcome, BruteForcer};
use crate::error::Result;
use crate::resolver::{DnsResolver, Resolve};
use crate::session::Session;
use crate::shutdown::ShutdownListener;
use crate::sources::{create_source, Source};
use crate::types::{ScanConfig, ScanReport, ScanStats, SubdomainSet, SubscoutError};
use crate::wildcard;
use crate::wordlist::CandidateFeed;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::BufReader;

const PASSIVE_SOURCE: &str = "crtsh";

/// Wordlist and worker pool, ready to run.
struct ActiveRun {
    feed: CandidateFeed<BufReader<File>>,
    forcer: BruteForcer,
}

pub struct ScanEngine {
    config: Arc<ScanConfig>,
    session: Session,
    source: Box<dyn Source>,
    resolver: Arc<dyn Resolve>,
}

impl ScanEngine {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let resolver: Arc<dyn Resolve> = Arc::new(DnsResolver::new(&config.resolver)?);
        Self::with_resolver(config, resolver)
    }

    /// Builds an engine around any resolver implementation.
    pub fn with_resolver(config: ScanConfig, resolver: Arc<dyn Resolve>) -> Result<Self> {
        let session = Session::new(&config.passive)?;
        let source = create_source(PASSIVE_SOURCE, &config.passive).ok_or_else(|| {
            SubscoutError::ConfigError(format!("Unknown passive source: {}", PASSIVE_SOURCE))
        })?;

        Ok(Self {
            config: Arc::new(config),
            session,
            source,
            resolver,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Runs the passive and active halves concurrently and merges them.
    ///
    /// The wordlist is opened and the worker pool configured before any
    /// network traffic, so a configuration error never discards a finished
    /// passive query.
    pub async fn run(&self, shutdown: ShutdownListener) -> Result<ScanReport> {
        let config = &self.config;
        info!("Scanning {} in {} mode", config.domain, config.mode);
        let start_time = Instant::now();

        let prepared = self.prepare_active().await?;
        let (passive, active) = tokio::join!(
            self.run_passive(shutdown.clone()),
            self.run_active(prepared, shutdown.clone())
        );

        let subdomains = aggregate(config.mode, &active.found, &passive, &config.domain);

        let stats = ScanStats {
            candidates_probed: active.probed,
            resolved_count: active.found.len(),
            passive_count: passive.len(),
            unique_subdomains: subdomains.len(),
            interrupted: active.interrupted || shutdown.is_triggered(),
            duration: start_time.elapsed(),
        };

        Ok(ScanReport {
            domain: config.domain.clone(),
            mode: config.mode,
            subdomains,
            stats,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Passive failures never abort the scan; they yield an empty set, as
    /// does an interrupt while the query is in flight.
    async fn run_passive(&self, mut shutdown: ShutdownListener) -> SubdomainSet {
        if !self.config.mode.runs_passive() {
            return SubdomainSet::new();
        }

        info!("Fetching subdomains from {} for {}", self.source.name(), self.config.domain);
        let start = Instant::now();
        let fetched = tokio::select! {
            biased;
            _ = shutdown.triggered() => {
                warn!("{} query abandoned after interrupt", self.source.name());
                return SubdomainSet::new();
            }
            fetched = self.source.enumerate(&self.config.domain, &self.session) => fetched,
        };

        match fetched {
            Ok(found) => {
                info!(
                    "{}: found {} names in {:.2}s",
                    self.source.name(),
                    found.len(),
                    start.elapsed().as_secs_f64()
                );
                found
            }
            Err(e) => {
                warn!("{} unavailable, continuing without passive results: {}", self.source.name(), e);
                SubdomainSet::new()
            }
        }
    }

    async fn prepare_active(&self) -> Result<Option<ActiveRun>> {
        let config = &self.config;
        if !config.mode.runs_active() {
            return Ok(None);
        }

        let path = config.wordlist.as_deref().ok_or_else(|| {
            SubscoutError::ConfigError("A wordlist is required for brute-forcing".to_string())
        })?;
        let feed = CandidateFeed::open(path, config.domain.clone()).await?;

        let mut forcer = BruteForcer::new(self.resolver.clone(), config.threads, config.resolver.timeout)?;
        if let Some(qps) = config.resolver.rate_limit {
            forcer = forcer.with_rate_limit(qps)?;
        }

        Ok(Some(ActiveRun { feed, forcer }))
    }

    async fn run_active(&self, prepared: Option<ActiveRun>, mut shutdown: ShutdownListener) -> BruteForceOutcome {
        let config = &self.config;
        let Some(ActiveRun { feed, forcer }) = prepared else {
            return BruteForceOutcome {
                found: SubdomainSet::new(),
                probed: 0,
                interrupted: false,
            };
        };

        let wildcard_ips = if config.resolver.filter_wildcards {
            let detection = wildcard::detect_wildcard(
                self.resolver.as_ref(),
                &config.domain,
                wildcard::WILDCARD_PROBES,
                config.resolver.timeout,
            );
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    return BruteForceOutcome {
                        found: SubdomainSet::new(),
                        probed: 0,
                        interrupted: true,
                    };
                }
                ips = detection => ips,
            }
        } else {
            Default::default()
        };

        let progress = self.progress_bar();
        let forcer = forcer.with_progress(progress.clone());

        info!(
            "Starting DNS brute-force for {} with {} workers",
            config.domain,
            forcer.concurrency()
        );
        let mut outcome = forcer.run(feed, shutdown).await;
        progress.finish_and_clear();

        if !wildcard_ips.is_empty() {
            let removed = wildcard::filter_wildcards(&mut outcome.found, &wildcard_ips);
            info!("Discarded {} wildcard matches", removed);
        }

        info!(
            "DNS brute-force complete: {} probed, {} resolved",
            outcome.probed,
            outcome.found.len()
        );
        outcome
    }

    fn progress_bar(&self) -> ProgressBar {
        if self.config.output.silent || !atty::is(atty::Stream::Stderr) {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {pos} probed, {msg}") {
            bar.set_style(style);
        }
        bar.set_message("0 found");
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}
