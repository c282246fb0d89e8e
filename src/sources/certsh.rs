// src/sources/certsh.rs
use crate::session::Session;
use crate::sources::Source;
use crate::types::{Domain, SubdomainResult, SubdomainSet, SubscoutError};
use crate::utils;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Only the fields we read; crt.sh sends many more.
#[derive(Debug, Default, Deserialize)]
struct CrtShRecord {
    #[serde(default)]
    name_value: Option<String>,
    #[serde(default)]
    common_name: Option<String>,
}

/// CRT.sh certificate transparency logs source
#[derive(Debug, Clone)]
pub struct CrtShSource {
    name: String,
    endpoint: String,
}

impl CrtShSource {
    pub fn new(endpoint: &str) -> Self {
        Self {
            name: "crtsh".to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Parses a crt.sh JSON body. Records that are not objects, or lack both
    /// name fields, are skipped.
    pub fn parse_response(&self, body: &str) -> Result<SubdomainSet, SubscoutError> {
        let records: Vec<Value> = serde_json::from_str(body).map_err(|e| SubscoutError::SourceError {
            source_name: self.name.clone(),
            message: format!("Failed to parse JSON: {}", e),
        })?;

        let mut results = SubdomainSet::new();
        for record in records {
            let record: CrtShRecord = serde_json::from_value(record).unwrap_or_default();
            let values = record.name_value.iter().chain(record.common_name.iter());

            // name_value can hold several names separated by newlines
            for name in values.flat_map(|value| value.lines()).filter_map(utils::clean_certificate_name) {
                results.insert(SubdomainResult::new(name, &self.name));
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl Source for CrtShSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enumerate(&self, domain: &Domain, session: &Session) -> Result<SubdomainSet, SubscoutError> {
        let query = format!("%.{}", domain);
        let body = session
            .get_text(&self.endpoint, &[("q", query.as_str()), ("output", "json")])
            .await
            .map_err(|e| SubscoutError::SourceError {
                source_name: self.name.clone(),
                message: format!("HTTP request failed: {}", e),
            })?;

        self.parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PassiveConfig;
    use mockito::Matcher;
    use std::time::Duration;

    fn names(set: &SubdomainSet) -> Vec<&str> {
        set.names().collect()
    }

    #[test]
    fn test_parse_strips_wildcards_and_dedups() {
        let source = CrtShSource::new("https://crt.sh/");
        let body = r#"[
            {"id": 1, "name_value": "*.example.com"},
            {"id": 2, "name_value": "api.example.com"},
            {"id": 3, "common_name": "API.example.com"}
        ]"#;
        let set = source.parse_response(body).unwrap();
        assert_eq!(names(&set), vec!["api.example.com", "example.com"]);
    }

    #[test]
    fn test_parse_splits_multi_value_fields() {
        let source = CrtShSource::new("https://crt.sh/");
        let body = r#"[{"name_value": "www.example.com\nmail.example.com\n\n*.dev.example.com", "common_name": "www.example.com"}]"#;
        let set = source.parse_response(body).unwrap();
        assert_eq!(
            names(&set),
            vec!["dev.example.com", "mail.example.com", "www.example.com"]
        );
        assert!(set.iter().all(|r| r.sources.contains("crtsh")));
    }

    #[test]
    fn test_parse_drops_email_entries() {
        let source = CrtShSource::new("https://crt.sh/");
        let body = r#"[{"name_value": "hostmaster@mail.example.com\nwww.example.com"}]"#;
        let set = source.parse_response(body).unwrap();
        assert_eq!(names(&set), vec!["www.example.com"]);
    }

    #[test]
    fn test_parse_tolerates_odd_records() {
        let source = CrtShSource::new("https://crt.sh/");
        let body = r#"[42, {"issuer_name": "C=US"}, {"name_value": null}, {"name_value": "ok.example.com", "extra": [1, 2]}]"#;
        let set = source.parse_response(body).unwrap();
        assert_eq!(names(&set), vec!["ok.example.com"]);
    }

    #[test]
    fn test_parse_rejects_malformed_body() {
        let source = CrtShSource::new("https://crt.sh/");
        assert!(matches!(
            source.parse_response("<html>rate limited</html>"),
            Err(SubscoutError::SourceError { .. })
        ));
        assert!(source.parse_response(r#"{"name_value": "x.example.com"}"#).is_err());
    }

    #[tokio::test]
    async fn test_enumerate_queries_crtsh() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "%.example.com".into()),
                Matcher::UrlEncoded("output".into(), "json".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name_value": "*.example.com"}, {"name_value": "api.example.com"}]"#)
            .create_async()
            .await;

        let source = CrtShSource::new(&format!("{}/", server.url()));
        let session = Session::new(&PassiveConfig::default()).unwrap();
        let domain = Domain::parse("example.com").unwrap();

        let set = source.enumerate(&domain, &session).await.unwrap();
        assert_eq!(names(&set), vec!["api.example.com", "example.com"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_enumerate_error_status_is_source_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let source = CrtShSource::new(&format!("{}/", server.url()));
        let session = Session::new(&PassiveConfig::default()).unwrap();
        let domain = Domain::parse("example.com").unwrap();

        let result = source.enumerate(&domain, &session).await;
        assert!(matches!(result, Err(SubscoutError::SourceError { .. })));
    }

    #[tokio::test]
    async fn test_enumerate_times_out() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _holder = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let config = PassiveConfig {
            timeout: Duration::from_millis(200),
            ..PassiveConfig::default()
        };
        let source = CrtShSource::new(&format!("http://{}/", addr));
        let session = Session::new(&config).unwrap();
        let domain = Domain::parse("example.com").unwrap();

        let started = std::time::Instant::now();
        let result = source.enumerate(&domain, &session).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
