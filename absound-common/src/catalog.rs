//! Sample catalog parsing
//!
//! Turns the list of audio filenames produced by the catalog provider into
//! structured [`Sample`] records. Filenames encode the synthesis parameters:
//!
//! ```text
//! sample_e0.5_cfg0.3_t0.8.wav
//! ^^^^^^  ^^^    ^^^  ^^^ ^^^
//! prefix  exag   cfg  temp ext
//! ```
//!
//! Prefix is `sample` or `test`, extension is `wav`, `aiff` or `aif`, matched
//! case-insensitively. Anything else is dropped with a warning.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Stable sample identifier: the filename without its extension
pub type SampleId = String;

static FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:sample|test)_e(\d+(?:\.\d+)?)_cfg(\d+(?:\.\d+)?)_t(\d+(?:\.\d+)?)\.(wav|aiff|aif)$")
        .expect("filename pattern is a valid regex")
});

/// One synthesized speech clip and the parameters it was generated with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: SampleId,
    /// URI the presentation layer loads the audio from
    pub file: String,
    pub exaggeration: f64,
    pub cfg: f64,
    pub temp: f64,
}

impl Sample {
    /// Parameter vector in axis order (exaggeration, cfg, temp)
    pub fn params(&self) -> [f64; 3] {
        [self.exaggeration, self.cfg, self.temp]
    }
}

/// Parse a single filename, returning `None` if it does not follow the naming grammar
pub fn parse_filename(filename: &str, base_url: &str) -> Option<Sample> {
    let caps = FILENAME_PATTERN.captures(filename)?;

    let exaggeration = caps[1].parse::<f64>().ok()?;
    let cfg = caps[2].parse::<f64>().ok()?;
    let temp = caps[3].parse::<f64>().ok()?;

    // Extension group is anchored at the end, so strip exactly that many bytes
    let ext_len = caps[4].len() + 1;
    let id = filename[..filename.len() - ext_len].to_string();

    let file = if base_url.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), filename)
    };

    Some(Sample {
        id,
        file,
        exaggeration,
        cfg,
        temp,
    })
}

/// Parse a sequence of filenames into samples
///
/// Unparseable names are logged at warn level and omitted. Input order is
/// preserved. Duplicate ids are passed through as-is.
pub fn parse_catalog<S: AsRef<str>>(filenames: &[S], base_url: &str) -> Vec<Sample> {
    filenames
        .iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let parsed = parse_filename(name, base_url);
            if parsed.is_none() {
                warn!(filename = %name, "Could not parse filename");
            }
            parsed
        })
        .collect()
}

/// Split a catalog list file into filenames
///
/// Accepts either a JSON array of strings or plain text with one filename
/// per line. Blank lines and `#` comments are skipped in the text form.
pub fn parse_file_list(content: &str) -> crate::Result<Vec<String>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let names: Vec<String> = serde_json::from_str(trimmed)?;
        return Ok(names);
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
