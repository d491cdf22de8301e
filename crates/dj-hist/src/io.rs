//! JSON histogram files.
//!
//! A file holds either one histogram object or `{"histograms": [...]}`.

use std::path::Path;

use dj_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::histogram::Histogram;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistogramFile {
    Collection { histograms: Vec<Histogram> },
    Single(Histogram),
}

#[derive(Serialize)]
struct HistogramCollectionRef<'a> {
    histograms: &'a [Histogram],
}

/// Parse histograms from a JSON string.
pub fn parse_histograms(json: &str) -> Result<Vec<Histogram>> {
    let file: HistogramFile = serde_json::from_str(json)?;
    Ok(match file {
        HistogramFile::Collection { histograms } => histograms,
        HistogramFile::Single(h) => vec![h],
    })
}

/// Read all histograms stored in a JSON file.
pub fn read_histograms(path: &Path) -> Result<Vec<Histogram>> {
    let text = std::fs::read_to_string(path)?;
    let hists = parse_histograms(&text)?;
    tracing::debug!(path = %path.display(), n = hists.len(), "histograms loaded");
    Ok(hists)
}

/// Serialize histograms as a `{"histograms": [...]}` document.
pub fn histograms_to_json(hists: &[Histogram]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&HistogramCollectionRef { histograms: hists })?)
}

/// Write histograms to `path` as a `{"histograms": [...]}` document.
pub fn write_histograms(path: &Path, hists: &[Histogram]) -> Result<()> {
    std::fs::write(path, histograms_to_json(hists)?)?;
    Ok(())
}

/// Look a histogram up by name.
pub fn find_histogram<'a>(hists: &'a [Histogram], name: &str) -> Result<&'a Histogram> {
    hists.iter().find(|h| h.name == name).ok_or_else(|| {
        let known: Vec<&str> = hists.iter().map(|h| h.name.as_str()).collect();
        Error::Validation(format!("histogram '{name}' not found (available: {})", known.join(", ")))
    })
}
