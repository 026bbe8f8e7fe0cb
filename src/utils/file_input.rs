//! File input utilities for reading targets, domains and dictionaries

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read a line-separated file
///
/// Lines are trimmed; blank lines and `#` comments are skipped.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Error reading {}", path.display()))?;

    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("Error reading {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        lines.push(line.to_string());
    }

    log::debug!("Loaded {} lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Resolve the `--domain` argument
///
/// An existing file is read as a list of domains; anything else is taken as
/// a single domain.
pub fn resolve_domains(argument: &str) -> Result<Vec<String>> {
    let path = Path::new(argument);
    if path.is_file() {
        read_lines(path)
    } else {
        Ok(vec![argument.trim().to_string()])
    }
}
