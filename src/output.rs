// src/output.rs
use crate::types::{OutputConfig, OutputFormat, ScanReport, SubscoutError};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Prints the report to stdout, then copies it to the output file when
    /// one is configured. Stdout is always written first so results survive
    /// a failing file.
    pub fn write_report(&self, report: &ScanReport) -> Result<(), SubscoutError> {
        {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            self.write_output(&mut handle, report)?;
            handle
                .flush()
                .map_err(|e| SubscoutError::OutputError(e.to_string()))?;
        }

        if let Some(file_path) = &self.config.file {
            self.write_to_file(file_path, report)?;
        }
        Ok(())
    }

    fn write_to_file(&self, file_path: &Path, report: &ScanReport) -> Result<(), SubscoutError> {
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SubscoutError::OutputError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(file_path).map_err(|e| {
            SubscoutError::OutputError(format!("Failed to create {}: {}", file_path.display(), e))
        })?;
        let mut writer = BufWriter::new(file);
        self.write_output(&mut writer, report)?;
        writer
            .flush()
            .map_err(|e| SubscoutError::OutputError(e.to_string()))?;

        info!("Results saved to {}", file_path.display());
        Ok(())
    }

    pub fn write_output<W: Write>(&self, writer: &mut W, report: &ScanReport) -> Result<(), SubscoutError> {
        match self.config.format {
            OutputFormat::Text => self.write_text_output(writer, report),
            OutputFormat::Json => self.write_json_output(writer, report),
        }
    }

    fn write_text_output<W: Write>(&self, writer: &mut W, report: &ScanReport) -> Result<(), SubscoutError> {
        for subdomain in &report.subdomains {
            writeln!(writer, "{}", subdomain.subdomain)
                .map_err(|e| SubscoutError::OutputError(e.to_string()))?;
        }
        Ok(())
    }

    fn write_json_output<W: Write>(&self, writer: &mut W, report: &ScanReport) -> Result<(), SubscoutError> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| SubscoutError::OutputError(format!("Failed to serialize JSON: {}", e)))?;

        writeln!(writer, "{}", json).map_err(|e| SubscoutError::OutputError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Domain, ScanMode, ScanStats, SubdomainResult};
    use std::time::Duration;

    fn report() -> ScanReport {
        ScanReport {
            domain: Domain::parse("example.com").unwrap(),
            mode: ScanMode::Combined,
            subdomains: vec![
                SubdomainResult::new("api.example.com", "crtsh"),
                SubdomainResult::new("www.example.com", "bruteforce").with_addresses(["10.0.0.1"]),
            ],
            stats: ScanStats {
                candidates_probed: 3,
                resolved_count: 1,
                passive_count: 1,
                unique_subdomains: 2,
                interrupted: false,
                duration: Duration::from_millis(1500),
            },
            timestamp: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_text_output_is_one_name_per_line() {
        let manager = OutputManager::new(OutputConfig::default());
        let mut buf = Vec::new();
        manager.write_output(&mut buf, &report()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "api.example.com\nwww.example.com\n");
    }

    #[test]
    fn test_json_output() {
        let manager = OutputManager::new(OutputConfig {
            format: OutputFormat::Json,
            ..OutputConfig::default()
        });
        let mut buf = Vec::new();
        manager.write_output(&mut buf, &report()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["domain"], "example.com");
        assert_eq!(value["mode"], "combined");
        assert_eq!(value["subdomains"][1]["ip_addresses"][0], "10.0.0.1");
        assert_eq!(value["stats"]["candidates_probed"], 3);
    }

    #[test]
    fn test_report_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.txt");
        let manager = OutputManager::new(OutputConfig {
            file: Some(path.clone()),
            ..OutputConfig::default()
        });

        manager.write_report(&report()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "api.example.com\nwww.example.com\n"
        );
    }

    #[test]
    fn test_unwritable_file_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = OutputManager::new(OutputConfig {
            // a directory cannot be opened as a file
            file: Some(dir.path().to_path_buf()),
            ..OutputConfig::default()
        });
        assert!(matches!(
            manager.write_report(&report()),
            Err(SubscoutError::OutputError(_))
        ));
    }
}
