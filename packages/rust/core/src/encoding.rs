//! Text encoding detection over a bounded leading byte window.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};
use tracing::{debug, info};

use tabledown_shared::{Result, TabledownError};

/// Share of NUL bytes in one byte lane above which a sample reads as UTF-16.
const UTF16_NUL_RATIO: f32 = 0.3;

/// Best guess at a sample's encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingGuess {
    pub encoding: &'static Encoding,
    /// 0.0 (no evidence) to 1.0 (certain).
    pub confidence: f32,
    /// Whether the sample started with a byte-order mark.
    pub had_bom: bool,
}

impl EncodingGuess {
    /// WHATWG label of the guessed encoding, e.g. `UTF-8`.
    pub fn label(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Read at most `limit` leading bytes of a file.
pub fn read_sample(path: &Path, limit: usize) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| TabledownError::io(path, e))?;
    let mut sample = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64)
        .read_to_end(&mut sample)
        .map_err(|e| TabledownError::io(path, e))?;
    Ok(sample)
}

/// Guess the encoding of a leading byte window.
///
/// Checks, in order: byte-order mark, NUL-byte lanes typical of UTF-16
/// without a BOM, UTF-8 validity, and finally a statistical guess over
/// legacy single- and multi-byte encodings. An empty sample yields UTF-8
/// with zero confidence.
pub fn sniff_encoding(sample: &[u8]) -> EncodingGuess {
    let guess = guess_encoding(sample);
    info!(
        encoding = guess.label(),
        confidence = guess.confidence,
        had_bom = guess.had_bom,
        sample_len = sample.len(),
        "detected encoding"
    );
    guess
}

fn guess_encoding(sample: &[u8]) -> EncodingGuess {
    let plain = |encoding, confidence| EncodingGuess {
        encoding,
        confidence,
        had_bom: false,
    };

    if sample.is_empty() {
        return plain(UTF_8, 0.0);
    }

    if let Some((encoding, _bom_len)) = Encoding::for_bom(sample) {
        return EncodingGuess {
            encoding,
            confidence: 1.0,
            had_bom: true,
        };
    }

    if let Some(encoding) = utf16_by_nul_lanes(sample) {
        return plain(encoding, 0.8);
    }

    if sample.is_ascii() {
        return plain(UTF_8, 1.0);
    }

    match std::str::from_utf8(sample) {
        Ok(_) => plain(UTF_8, 0.99),
        // A multi-byte sequence cut by the end of the window is still UTF-8.
        Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => plain(UTF_8, 0.99),
        Err(_) => {
            let (encoding, confident) = detect_legacy(sample);
            plain(encoding, if confident { 0.8 } else { 0.5 })
        }
    }
}

/// Statistical guess for input that is not UTF-8.
fn detect_legacy(sample: &[u8]) -> (&'static Encoding, bool) {
    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    detector.guess_assess(None, false)
}

/// ASCII-heavy UTF-16 text has a NUL in every other byte.
fn utf16_by_nul_lanes(sample: &[u8]) -> Option<&'static Encoding> {
    let pairs = sample.len() / 2;
    if pairs == 0 {
        return None;
    }

    let (mut even_nuls, mut odd_nuls) = (0usize, 0usize);
    for pair in sample.chunks_exact(2) {
        even_nuls += usize::from(pair[0] == 0);
        odd_nuls += usize::from(pair[1] == 0);
    }

    let ratio = |count: usize| count as f32 / pairs as f32;
    if ratio(odd_nuls) >= UTF16_NUL_RATIO && even_nuls == 0 {
        Some(UTF_16LE)
    } else if ratio(even_nuls) >= UTF16_NUL_RATIO && odd_nuls == 0 {
        Some(UTF_16BE)
    } else {
        None
    }
}

/// Decode a byte sample with the guessed encoding.
///
/// A leading BOM is stripped and malformed sequences become U+FFFD.
pub fn decode(bytes: &[u8], guess: &EncodingGuess) -> String {
    let (text, used, had_errors) = guess.encoding.decode(bytes);
    if had_errors {
        debug!(
            encoding = used.name(),
            "sample contains malformed sequences, replaced with U+FFFD"
        );
    }
    text.into_owned()
}

/// Open a file as a UTF-8 byte stream transcoded from the guessed encoding.
///
/// A leading BOM is stripped and malformed sequences become U+FFFD.
pub fn open_decoded(
    path: &Path,
    guess: &EncodingGuess,
) -> Result<DecodeReaderBytes<File, Vec<u8>>> {
    let file = File::open(path).map_err(|e| TabledownError::io(path, e))?;
    Ok(DecodeReaderBytesBuilder::new()
        .encoding(Some(guess.encoding))
        .bom_override(true)
        .build(file))
}
