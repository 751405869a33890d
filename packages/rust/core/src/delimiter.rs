//! Field delimiter detection.
//!
//! Two tiers: a statistical sniff that looks for a candidate occurring the
//! same number of times on (nearly) every record, and a deterministic
//! fallback when the sample is too irregular to decide. Irregular samples
//! are expected input, so the fallback never fails.

use std::collections::BTreeMap;

use tracing::{debug, info};

/// Consistency thresholds tried in order, in percent of records.
const CONSISTENCY_STEPS: std::ops::RangeInclusive<usize> = 90..=100;

/// Outcome of delimiter detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterGuess {
    pub delimiter: u8,
    /// The statistical sniff was inconclusive and the fallback decided.
    pub fell_back: bool,
}

/// Detect the delimiter of a decoded text sample.
///
/// `truncated` tells the sniffer the sample was cut from a longer input, so
/// its last line may be partial. `candidates` are in preference order.
pub fn sniff_delimiter(sample: &str, truncated: bool, candidates: &[u8]) -> DelimiterGuess {
    match sniff_statistical(sample, truncated, candidates) {
        Some(delimiter) => {
            info!(delimiter = %display_delimiter(delimiter), "detected delimiter");
            DelimiterGuess {
                delimiter,
                fell_back: false,
            }
        }
        None => {
            let delimiter = fallback_delimiter(sample);
            info!(
                delimiter = %display_delimiter(delimiter),
                "delimiter sniff inconclusive, falling back"
            );
            DelimiterGuess {
                delimiter,
                fell_back: true,
            }
        }
    }
}

/// Tab when the first line has one, comma otherwise.
pub fn fallback_delimiter(sample: &str) -> u8 {
    match sample.lines().next() {
        Some(first) if first.contains('\t') => b'\t',
        _ => b',',
    }
}

/// Human-readable delimiter name for logs and summaries.
pub fn display_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "tab".to_string(),
        b',' => "comma".to_string(),
        b';' => "semicolon".to_string(),
        b'|' => "pipe".to_string(),
        other => format!("{:?}", other as char),
    }
}

// ---------------------------------------------------------------------------
// Statistical tier
// ---------------------------------------------------------------------------

fn sniff_statistical(sample: &str, truncated: bool, candidates: &[u8]) -> Option<u8> {
    let mut records = count_per_record(sample, candidates);
    if truncated && records.len() > 1 {
        records.pop();
    }
    if records.is_empty() {
        return None;
    }

    let total = records.len();
    let modes: Vec<(usize, usize)> = (0..candidates.len())
        .map(|idx| modal_count(records.iter().map(|counts| counts[idx])))
        .collect();

    for threshold in CONSISTENCY_STEPS.rev() {
        let qualified = candidates
            .iter()
            .zip(&modes)
            .find(|(_, (count, freq))| *count > 0 && freq * 100 >= total * threshold);

        if let Some((&delimiter, (count, freq))) = qualified {
            debug!(
                delimiter = %display_delimiter(delimiter),
                per_record = count,
                matching_records = freq,
                total,
                threshold,
                "delimiter qualified"
            );
            return Some(delimiter);
        }
    }

    None
}

/// Per non-blank record, how often each candidate occurs outside quotes.
///
/// Quote state carries across line breaks, so a quoted field spanning
/// lines stays inside one record.
fn count_per_record(sample: &str, candidates: &[u8]) -> Vec<Vec<usize>> {
    let mut records = Vec::new();
    let mut counts = vec![0usize; candidates.len()];
    let mut in_quotes = false;
    let mut has_content = false;

    for ch in sample.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_content = true;
            }
            '\n' if !in_quotes => {
                if has_content {
                    records.push(std::mem::replace(&mut counts, vec![0; candidates.len()]));
                }
                has_content = false;
            }
            '\r' if !in_quotes => {}
            _ => {
                has_content = true;
                if !in_quotes && ch.is_ascii() {
                    if let Some(idx) = candidates.iter().position(|&c| c == ch as u8) {
                        counts[idx] += 1;
                    }
                }
            }
        }
    }
    if has_content {
        records.push(counts);
    }

    records
}

/// Most frequent value and how many times it occurs; ties go to the larger value.
fn modal_count(values: impl Iterator<Item = usize>) -> (usize, usize) {
    let mut frequency: BTreeMap<usize, usize> = BTreeMap::new();
    for value in values {
        *frequency.entry(value).or_default() += 1;
    }
    frequency
        .into_iter()
        .max_by_key(|&(value, freq)| (freq, value))
        .unwrap_or((0, 0))
}
