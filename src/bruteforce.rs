// src/bruteforce.rs
//! Bounded-concurrency DNS brute-forcing.
//!
//! A feeder drains the `CandidateFeed` into a bounded channel; `N` spawned
//! workers share its receiver, so each candidate is claimed by exactly one
//! worker and memory stays proportional to `N` rather than to the wordlist.
//! Confirmed names land in a shard-locked `DashMap` and are turned into a
//! `SubdomainSet` once every worker has been joined.

use crate::error::Result;
use crate::resolver::Resolve;
use crate::shutdown::ShutdownListener;
use crate::types::{ResolutionOutcome, SubdomainResult, SubdomainSet, SubscoutError, MAX_THREADS};
use crate::utils;
use crate::wordlist::CandidateFeed;
use dashmap::DashMap;
use futures::future::join_all;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use indicatif::ProgressBar;
use log::{debug, error};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::sync::{mpsc, Mutex};

pub const BRUTEFORCE_SOURCE: &str = "bruteforce";

pub struct BruteForceOutcome {
    pub found: SubdomainSet,
    pub probed: usize,
    pub interrupted: bool,
}

pub struct BruteForcer {
    resolver: Arc<dyn Resolve>,
    concurrency: usize,
    timeout: Duration,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    progress: ProgressBar,
}

impl BruteForcer {
    pub fn new(resolver: Arc<dyn Resolve>, concurrency: usize, timeout: Duration) -> Result<Self> {
        if concurrency == 0 || concurrency > MAX_THREADS {
            return Err(SubscoutError::ConfigError(format!(
                "Thread count must be between 1 and {}, got {}",
                MAX_THREADS, concurrency
            )));
        }
        if timeout.is_zero() {
            return Err(SubscoutError::ConfigError(
                "DNS timeout must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            resolver,
            concurrency,
            timeout,
            limiter: None,
            progress: ProgressBar::hidden(),
        })
    }

    /// Caps DNS queries per second across all workers.
    pub fn with_rate_limit(mut self, queries_per_second: u32) -> Result<Self> {
        let rate = NonZeroU32::new(queries_per_second).ok_or_else(|| {
            SubscoutError::ConfigError("Rate limit must be greater than 0".to_string())
        })?;
        self.limiter = Some(Arc::new(RateLimiter::direct(Quota::per_second(rate))));
        Ok(self)
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probes every candidate of `feed` and returns once the feed is
    /// exhausted and all workers have finished, or once `shutdown` fires,
    /// in which case the partial results are returned.
    pub async fn run<R>(&self, feed: CandidateFeed<R>, shutdown: ShutdownListener) -> BruteForceOutcome
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let (tx, rx) = mpsc::channel::<String>(self.concurrency * 2);

        let worker = Worker {
            queue: Arc::new(Mutex::new(rx)),
            resolver: self.resolver.clone(),
            timeout: self.timeout,
            limiter: self.limiter.clone(),
            found: Arc::new(DashMap::new()),
            probed: Arc::new(AtomicUsize::new(0)),
            progress: self.progress.clone(),
            shutdown: shutdown.clone(),
        };

        let handles: Vec<_> = (0..self.concurrency)
            .map(|id| tokio::spawn(worker.clone().run(id)))
            .collect();

        let (_, joined) = tokio::join!(feed_queue(feed, tx, shutdown.clone()), join_all(handles));

        for result in joined {
            if let Err(e) = result {
                error!("Brute-force worker failed: {}", e);
            }
        }

        let found: SubdomainSet = worker
            .found
            .iter()
            .map(|entry| {
                SubdomainResult::new(entry.key().clone(), BRUTEFORCE_SOURCE)
                    .with_addresses(entry.value().iter())
            })
            .collect();

        BruteForceOutcome {
            found,
            probed: worker.probed.load(Ordering::SeqCst),
            interrupted: shutdown.is_triggered(),
        }
    }
}

/// Pushes candidates in feed order; dropping `tx` on return closes the queue.
async fn feed_queue<R>(mut feed: CandidateFeed<R>, tx: mpsc::Sender<String>, mut shutdown: ShutdownListener)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.triggered() => break,
            next = feed.next_candidate() => next,
        };
        let Some(candidate) = next else {
            break;
        };

        tokio::select! {
            biased;
            _ = shutdown.triggered() => break,
            sent = tx.send(candidate) => {
                // All workers are gone.
                if sent.is_err() {
                    break;
                }
            }
        }
    }
}

#[derive(Clone)]
struct Worker {
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
    resolver: Arc<dyn Resolve>,
    timeout: Duration,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    found: Arc<DashMap<String, Vec<IpAddr>>>,
    probed: Arc<AtomicUsize>,
    progress: ProgressBar,
    shutdown: ShutdownListener,
}

impl Worker {
    async fn run(mut self, id: usize) {
        let queue = Arc::clone(&self.queue);
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.triggered() => break,
                next = async { queue.lock().await.recv().await } => next,
            };
            let Some(candidate) = next else {
                break;
            };

            if let Some(limiter) = &self.limiter {
                tokio::select! {
                    biased;
                    _ = self.shutdown.triggered() => break,
                    _ = limiter.until_ready() => {}
                }
            }

            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.triggered() => break,
                outcome = self.resolver.resolve(&candidate, self.timeout) => outcome,
            };

            self.probed.fetch_add(1, Ordering::SeqCst);
            self.progress.inc(1);
            self.record(id, outcome);
        }
    }

    fn record(&self, id: usize, outcome: ResolutionOutcome) {
        match outcome {
            ResolutionOutcome::Resolved { name, addresses } => {
                debug!(
                    "[worker {}] Resolved: {} -> {}",
                    id,
                    name,
                    addresses.iter().map(|ip| ip.to_string()).collect::<Vec<_>>().join(", ")
                );
                let mut entry = self.found.entry(utils::normalize_name(&name)).or_default();
                for ip in addresses {
                    if !entry.contains(&ip) {
                        entry.push(ip);
                    }
                }
                drop(entry);
                self.progress.set_message(format!("{} found", self.found.len()));
            }
            ResolutionOutcome::NotFound { name } => debug!("[worker {}] No record for: {}", id, name),
            ResolutionOutcome::TimedOut { name } => debug!("[worker {}] Timeout resolving: {}", id, name),
            ResolutionOutcome::Error { name, cause } => {
                debug!("[worker {}] Error resolving {}: {}", id, name, cause)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::shutdown::Shutdown;
    use crate::types::Domain;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::net::Ipv4Addr;

    /// Deterministic resolver that records every probe.
    pub(crate) struct MockResolver {
        records: HashMap<String, Vec<IpAddr>>,
        delay: Duration,
        calls: std::sync::Mutex<HashMap<String, usize>>,
    }

    impl MockResolver {
        pub(crate) fn new(resolvable: &[&str]) -> Self {
            let records = resolvable
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    (name.to_string(), vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, i as u8 + 1))])
                })
                .collect();
            Self {
                records,
                delay: Duration::ZERO,
                calls: std::sync::Mutex::new(HashMap::new()),
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn calls(&self) -> HashMap<String, usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Resolve for MockResolver {
        async fn resolve(&self, candidate: &str, _timeout: Duration) -> ResolutionOutcome {
            *self.calls.lock().unwrap().entry(candidate.to_string()).or_insert(0) += 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.records.get(candidate) {
                Some(addresses) => ResolutionOutcome::Resolved {
                    name: candidate.to_string(),
                    addresses: addresses.clone(),
                },
                None if candidate.starts_with("slow") => ResolutionOutcome::TimedOut {
                    name: candidate.to_string(),
                },
                None => ResolutionOutcome::NotFound {
                    name: candidate.to_string(),
                },
            }
        }
    }

    fn domain() -> Domain {
        Domain::parse("example.com").unwrap()
    }

    async fn scan(resolver: Arc<MockResolver>, wordlist: &str, threads: usize) -> BruteForceOutcome {
        let shutdown = Shutdown::new();
        let forcer = BruteForcer::new(resolver, threads, Duration::from_secs(1)).unwrap();
        let feed = CandidateFeed::new(wordlist.as_bytes(), domain());
        forcer.run(feed, shutdown.subscribe()).await
    }

    #[tokio::test]
    async fn test_resolves_known_names_sorted() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com", "mail.example.com"]));
        let outcome = scan(resolver, "www\nmail\ndoesnotexist123\n", 10).await;

        let names: Vec<&str> = outcome.found.names().collect();
        assert_eq!(names, vec!["mail.example.com", "www.example.com"]);
        assert_eq!(outcome.probed, 3);
        assert!(!outcome.interrupted);
    }

    #[tokio::test]
    async fn test_each_candidate_probed_exactly_once() {
        let words: Vec<String> = (0..200).map(|i| format!("host{}", i)).collect();
        let wordlist = format!("{}\n\n# comment\n", words.join("\n"));
        let expected: HashSet<String> = words.iter().map(|w| format!("{}.example.com", w)).collect();

        for threads in [1, 3, 16, 64] {
            let resolver = Arc::new(MockResolver::new(&[]));
            let outcome = scan(resolver.clone(), &wordlist, threads).await;

            let calls = resolver.calls();
            assert_eq!(calls.keys().cloned().collect::<HashSet<_>>(), expected);
            assert!(calls.values().all(|&count| count == 1), "duplicate probe with {} threads", threads);
            assert_eq!(outcome.probed, expected.len());
        }
    }

    #[tokio::test]
    async fn test_result_independent_of_concurrency() {
        let resolvable = ["a.example.com", "c.example.com", "e.example.com"];
        let wordlist = "a\nb\nc\nd\ne\nf\ng\n";

        let baseline = scan(Arc::new(MockResolver::new(&resolvable)), wordlist, 1).await.found;
        for threads in [2, 5, 32] {
            let found = scan(Arc::new(MockResolver::new(&resolvable)), wordlist, threads).await.found;
            assert_eq!(found, baseline);
        }
        assert_eq!(baseline.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_wordlist_completes_empty() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com"]));
        let outcome = scan(resolver.clone(), "\n\n", 4).await;
        assert!(outcome.found.is_empty());
        assert_eq!(outcome.probed, 0);
        assert!(resolver.calls().is_empty());
    }

    #[tokio::test]
    async fn test_negative_outcomes_are_discarded() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com"]));
        let outcome = scan(resolver, "www\nslow\nmissing\n", 2).await;
        assert_eq!(outcome.found.names().collect::<Vec<_>>(), vec!["www.example.com"]);
        assert_eq!(outcome.probed, 3);
    }

    #[tokio::test]
    async fn test_out_of_scope_entries_are_probed_literally() {
        let resolver = Arc::new(MockResolver::new(&["host.other.org.example.com"]));
        let outcome = scan(resolver.clone(), "host.other.org\n", 2).await;
        assert!(resolver.calls().contains_key("host.other.org.example.com"));
        assert!(outcome.found.contains("host.other.org.example.com"));
    }

    #[tokio::test]
    async fn test_duplicate_words_collapse() {
        let resolver = Arc::new(MockResolver::new(&["www.example.com"]));
        let outcome = scan(resolver, "www\nWWW\nwww\n", 3).await;
        assert_eq!(outcome.found.len(), 1);
    }

    #[test]
    fn test_zero_threads_is_config_error() {
        let resolver = Arc::new(MockResolver::new(&[]));
        let result = BruteForcer::new(resolver.clone(), 0, Duration::from_secs(1));
        assert!(matches!(result, Err(SubscoutError::ConfigError(_))));

        let result = BruteForcer::new(resolver, usize::MAX, Duration::from_secs(1));
        assert!(matches!(result, Err(SubscoutError::ConfigError(_))));
    }

    #[test]
    fn test_zero_rate_limit_is_config_error() {
        let resolver = Arc::new(MockResolver::new(&[]));
        let forcer = BruteForcer::new(resolver, 2, Duration::from_secs(1)).unwrap();
        assert!(forcer.with_rate_limit(0).is_err());
    }

    #[tokio::test]
    async fn test_rate_limited_scan_still_probes_everything() {
        let resolver = Arc::new(MockResolver::new(&["b.example.com"]));
        let forcer = BruteForcer::new(resolver.clone(), 4, Duration::from_secs(1))
            .unwrap()
            .with_rate_limit(1000)
            .unwrap();
        let shutdown = Shutdown::new();
        let feed = CandidateFeed::new("a\nb\nc\n".as_bytes(), domain());
        let outcome = forcer.run(feed, shutdown.subscribe()).await;
        assert_eq!(outcome.probed, 3);
        assert_eq!(outcome.found.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_returns_partial_results() {
        let resolver = Arc::new(MockResolver::new(&[]).with_delay(Duration::from_secs(30)));
        let forcer = BruteForcer::new(resolver, 4, Duration::from_secs(60)).unwrap();
        let shutdown = Shutdown::new();
        let listener = shutdown.subscribe();

        let words: String = (0..100).map(|i| format!("w{}\n", i)).collect();
        let run = async {
            let feed = CandidateFeed::new(words.as_bytes(), domain());
            forcer.run(feed, listener).await
        };
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            shutdown.trigger();
        };

        let (outcome, _) = tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(run, trigger) })
            .await
            .expect("pool did not stop after shutdown");
        assert!(outcome.interrupted);
        assert!(outcome.probed < 100);
    }
}
