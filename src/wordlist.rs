// src/wordlist.rs
use crate::error::{ErrorContext, Result};
use crate::types::Domain;
use log::warn;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

const COMMENT_PREFIX: char = '#';

/// Lazily turns wordlist lines into probe names (`word.domain`).
///
/// Lines are read on demand, so arbitrarily large wordlists never sit in
/// memory at once. Blank lines and `#` comments are skipped.
pub struct CandidateFeed<R> {
    lines: Lines<R>,
    domain: Domain,
    exhausted: bool,
}

impl CandidateFeed<BufReader<File>> {
    pub async fn open(path: &Path, domain: Domain) -> Result<Self> {
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open wordlist {}", path.display()))?;
        Ok(Self::new(BufReader::new(file), domain))
    }
}

impl<R: AsyncBufRead + Unpin> CandidateFeed<R> {
    pub fn new(reader: R, domain: Domain) -> Self {
        Self {
            lines: reader.lines(),
            domain,
            exhausted: false,
        }
    }

    /// Next candidate, or `None` once the wordlist is exhausted. A read
    /// error ends the feed early.
    pub async fn next_candidate(&mut self) -> Option<String> {
        while !self.exhausted {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    let word = line.trim();
                    if word.is_empty() || word.starts_with(COMMENT_PREFIX) {
                        continue;
                    }
                    return Some(self.domain.candidate(word));
                }
                Ok(None) => self.exhausted = true,
                Err(e) => {
                    warn!("Stopped reading wordlist early: {}", e);
                    self.exhausted = true;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect<R: AsyncBufRead + Unpin>(mut feed: CandidateFeed<R>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(candidate) = feed.next_candidate().await {
            out.push(candidate);
        }
        out
    }

    fn domain() -> Domain {
        Domain::parse("example.com").unwrap()
    }

    #[tokio::test]
    async fn test_skips_blank_and_comment_lines() {
        let text = "www\n\n   \n# staging hosts\n  mail  \r\ndev\n";
        let feed = CandidateFeed::new(text.as_bytes(), domain());
        assert_eq!(
            collect(feed).await,
            vec!["www.example.com", "mail.example.com", "dev.example.com"]
        );
    }

    #[tokio::test]
    async fn test_empty_wordlist_yields_nothing() {
        let feed = CandidateFeed::new("".as_bytes(), domain());
        assert!(collect(feed).await.is_empty());
    }

    #[tokio::test]
    async fn test_preserves_feed_order_and_duplicates() {
        let feed = CandidateFeed::new("b\na\nb\n".as_bytes(), domain());
        assert_eq!(
            collect(feed).await,
            vec!["b.example.com", "a.example.com", "b.example.com"]
        );
    }

    #[tokio::test]
    async fn test_open_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api").unwrap();
        writeln!(file, "vpn").unwrap();

        let feed = CandidateFeed::open(file.path(), domain()).await.unwrap();
        assert_eq!(collect(feed).await, vec!["api.example.com", "vpn.example.com"]);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_config_error() {
        let result = CandidateFeed::open(Path::new("/no/such/wordlist.txt"), domain()).await;
        assert!(result.err().map_or(false, |e| e.is_config()));
    }

    #[tokio::test]
    async fn test_exhausted_feed_stays_exhausted() {
        let mut feed = CandidateFeed::new("www\n".as_bytes(), domain());
        assert!(feed.next_candidate().await.is_some());
        assert!(feed.next_candidate().await.is_none());
        assert!(feed.next_candidate().await.is_none());
    }
}
