//! Output formatting and replay of previous results

use crate::engine::Record;
use crate::{ReconError, ReconResult};
use colored::Colorize;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Gutter between table columns
const TABLE_PADDING: usize = 4;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned columns: IP, Hostname, Source
    #[default]
    Table,
    /// `hostname,ip,source` lines
    Csv,
    /// Hostnames grouped under each IP
    Clean,
    /// Array of `{src, ip, hostname}` objects
    Json,
}

impl OutputFormat {
    /// Pick a format from the command line switches; JSON wins, then CSV,
    /// then clean.
    pub fn from_flags(json: bool, csv: bool, clean: bool) -> Self {
        match (json, csv, clean) {
            (true, _, _) => OutputFormat::Json,
            (false, true, _) => OutputFormat::Csv,
            (false, false, true) => OutputFormat::Clean,
            _ => OutputFormat::Table,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" | "txt" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "clean" => Ok(OutputFormat::Clean),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<String>,
    pub colored: bool,
}

/// Main output manager
pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Write records to the configured file, or stdout
    pub fn write_results(&self, records: &[Record]) -> io::Result<()> {
        let output = self.render(records)?;

        match &self.config.file {
            Some(filename) => {
                let mut file = File::create(filename)?;
                file.write_all(output.as_bytes())?;
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(output.as_bytes())?;
                handle.flush()?;
            }
        }

        Ok(())
    }

    /// Render records in the configured format
    pub fn render(&self, records: &[Record]) -> io::Result<String> {
        match self.config.format {
            OutputFormat::Table => Ok(self.format_table(records)),
            OutputFormat::Csv => format_csv(records),
            OutputFormat::Clean => Ok(format_clean(records)),
            OutputFormat::Json => format_json(records),
        }
    }

    fn format_table(&self, records: &[Record]) -> String {
        let header = ["IP", "Hostname", "Source"];
        let ip_width = records
            .iter()
            .map(|r| r.ip.len())
            .chain([header[0].len()])
            .max()
            .unwrap_or(0)
            + TABLE_PADDING;
        let host_width = records
            .iter()
            .map(|r| r.hostname.len())
            .chain([header[1].len()])
            .max()
            .unwrap_or(0)
            + TABLE_PADDING;

        let mut output = String::new();
        let header_line =
            format!("{:<ip_width$}{:<host_width$}{}", header[0], header[1], header[2]);
        if self.config.colored {
            output.push_str(&header_line.bold().to_string());
        } else {
            output.push_str(&header_line);
        }
        output.push('\n');

        for record in records {
            output.push_str(&format!(
                "{:<ip_width$}{:<host_width$}{}\n",
                record.ip, record.hostname, record.source
            ));
        }

        output
    }
}

/// CSV lines ordered hostname, ip, source
///
/// The field order differs from the table's; scripts built on earlier
/// releases depend on it.
pub fn format_csv(records: &[Record]) -> io::Result<String> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for record in records {
        writer
            .write_record([&record.hostname, &record.ip, &record.source])
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Hostnames grouped by IP, IPs in order of first appearance
pub fn format_clean(records: &[Record]) -> String {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&str>> = HashMap::new();

    for record in records {
        groups
            .entry(record.ip.as_str())
            .or_insert_with(|| {
                order.push(record.ip.as_str());
                Vec::new()
            })
            .push(record.hostname.as_str());
    }

    let mut output = String::new();
    for ip in order {
        output.push_str(ip);
        output.push_str(":\n");
        for hostname in &groups[ip] {
            output.push('\t');
            output.push_str(hostname);
            output.push('\n');
        }
    }
    output
}

/// Pretty JSON with four-space indentation
pub fn format_json(records: &[Record]) -> io::Result<String> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    records
        .serialize(&mut serializer)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    buffer.push(b'\n');
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Parse records previously written with the JSON format
pub fn parse_results(json: &str) -> ReconResult<Vec<Record>> {
    serde_json::from_str(json).map_err(|e| {
        ReconError::ParseError(format!("Error parsing JSON from previous scan: {}", e))
    })
}

/// Load a previous JSON result file
pub fn load_results<P: AsRef<Path>>(path: P) -> ReconResult<Vec<Record>> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|e| {
        ReconError::OutputError(format!("Error reading file {}: {}", path.display(), e))
    })?;
    parse_results(&data)
}
