//! End-to-end conversion: input file → sniff → classify → render → write.

use std::io::Read;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};

use tabledown_markdown::{RenderOutcome, render_row};
use tabledown_shared::{NamingConfig, PipelineConfig, RawRecord, Result, SchemaKind, TabledownError};

use crate::delimiter::{self, DelimiterGuess};
use crate::emitter::FileEmitter;
use crate::encoding::{self, EncodingGuess};
use crate::schema;

/// Summary of one conversion run.
#[derive(Debug)]
pub struct RunReport {
    /// Input file that was converted.
    pub input: PathBuf,
    /// Directory the documents were written to.
    pub output_dir: PathBuf,
    /// Detected encoding.
    pub encoding: EncodingGuess,
    /// Detected delimiter.
    pub delimiter: DelimiterGuess,
    /// Renderer chosen from the header.
    pub schema: SchemaKind,
    /// Paths written, in row order (repeats when names collide).
    pub written: Vec<PathBuf>,
    /// Rows excluded for lacking their identifying field.
    pub rows_skipped: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl RunReport {
    /// Number of write operations, counting overwrites.
    pub fn documents_written(&self) -> usize {
        self.written.len()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document is written.
    fn document_written(&self, path: &std::path::Path, count: usize);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_written(&self, _path: &std::path::Path, _count: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Convert one delimited text file into one Markdown file per row.
///
/// 1. Sniff the encoding from a bounded leading window
/// 2. Sniff the delimiter from a bounded decoded sample
/// 3. Stream the file through a decoder and classify the header
/// 4. Render each row and write it
///
/// A failure on any row aborts the remaining rows; documents already
/// written stay on disk.
#[instrument(skip_all, fields(input = %config.input.display()))]
pub fn convert_file(config: &PipelineConfig, progress: &dyn ProgressReporter) -> Result<RunReport> {
    let start = Instant::now();

    if !config.input.is_file() {
        return Err(TabledownError::config(format!(
            "Input file does not exist: {}",
            config.input.display()
        )));
    }

    info!(output_dir = %config.output_dir.display(), "starting conversion");

    // --- Phase 1: Encoding ---
    progress.phase("Detecting encoding");
    let sample = encoding::read_sample(&config.input, config.encoding_sample_bytes)?;
    let encoding = encoding::sniff_encoding(&sample);
    let file_len = std::fs::metadata(&config.input)
        .map_err(|e| TabledownError::io(&config.input, e))?
        .len();

    // --- Phase 2: Delimiter ---
    progress.phase("Detecting delimiter");
    let sample_text = encoding::decode(&sample, &encoding);
    drop(sample);
    let (delimiter_sample, cut) = leading_chars(&sample_text, config.delimiter_sample_bytes);
    let truncated = cut || file_len > config.encoding_sample_bytes as u64;
    let delimiter =
        delimiter::sniff_delimiter(delimiter_sample, truncated, &config.candidate_delimiters);

    // --- Phase 3: Output ---
    let emitter = FileEmitter::create(&config.output_dir)?;

    // --- Phase 4: Header + rows ---
    let source = encoding::open_decoded(&config.input, &encoding)?;
    let rows = render_rows(source, delimiter.delimiter, &emitter, &config.naming, progress)?;

    let report = RunReport {
        input: config.input.clone(),
        output_dir: emitter.dir().to_path_buf(),
        encoding,
        delimiter,
        schema: rows.schema,
        written: rows.written,
        rows_skipped: rows.skipped,
        elapsed: start.elapsed(),
    };

    info!(
        schema = %report.schema,
        documents = report.documents_written(),
        skipped = report.rows_skipped,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "conversion complete"
    );

    progress.done(&report);
    Ok(report)
}

/// Outcome of the row phase.
struct RenderedRows {
    schema: SchemaKind,
    written: Vec<PathBuf>,
    skipped: usize,
}

/// Classify the header of a decoded UTF-8 stream, then render and write each row.
fn render_rows<R: Read>(
    source: R,
    delimiter: u8,
    emitter: &FileEmitter,
    naming: &NamingConfig,
    progress: &dyn ProgressReporter,
) -> Result<RenderedRows> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| TabledownError::csv(0, e.to_string()))?
        .iter()
        .map(String::from)
        .collect();
    debug!(columns = headers.len(), "read header");

    let schema = schema::classify(&headers);

    progress.phase("Rendering rows");
    let mut written = Vec::new();
    let mut skipped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let cells = result.map_err(|e| TabledownError::csv(row, e.to_string()))?;
        let record = RawRecord::from_row(&headers, cells.iter());

        match render_row(row, &record, &schema, naming)? {
            RenderOutcome::Document(document) => {
                let path = emitter.emit(&document)?;
                progress.document_written(&path, written.len() + 1);
                written.push(path);
            }
            RenderOutcome::Skip => skipped += 1,
        }
    }

    Ok(RenderedRows {
        schema,
        written,
        skipped,
    })
}

/// Up to `limit` bytes of `text`, cut back to a char boundary, and whether anything was cut.
fn leading_chars(text: &str, limit: usize) -> (&str, bool) {
    if text.len() <= limit {
        return (text, false);
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (&text[..end], true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    use tabledown_shared::AppConfig;

    fn fixture_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn run(input: &Path, out: &Path) -> Result<RunReport> {
        let config = PipelineConfig::new(&AppConfig::default(), input, out)?;
        convert_file(&config, &SilentProgress)
    }

    fn write_input(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).expect("write input");
        path
    }

    fn read(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name))
            .unwrap_or_else(|e| panic!("failed to read {name}: {e}"))
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: RefCell<Vec<String>>,
        writes: RefCell<usize>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.borrow_mut().push(name.to_string());
        }
        fn document_written(&self, _path: &Path, count: usize) {
            *self.writes.borrow_mut() = count;
        }
        fn done(&self, _report: &RunReport) {}
    }

    // --- Scenarios ---

    #[test]
    fn kb_export_with_json_envelope() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(
            tmp.path(),
            "kb.csv",
            b"ID,TITLE,CONTENTS,CATEGORY\n\
              1,Setup Guide,\"{\"\"body\"\":\"\"<p>Hello</p>\"\"}\",Docs\n",
        );
        let out = tmp.path().join("out");

        let report = run(&input, &out).expect("run");
        assert_eq!(report.schema, SchemaKind::KnowledgeBase);
        assert_eq!(report.documents_written(), 1);
        assert_eq!(report.delimiter.delimiter, b',');

        let body = read(&out, "Setup Guide.md");
        assert!(body.starts_with("# Setup Guide\n\n## Metadata\n"));
        assert!(body.contains("- **ID**: 1\n"));
        assert!(body.contains("- **CATEGORY**: Docs\n"));
        assert!(body.contains("- **FULL_PATH**: \n"));
        assert!(body.contains("- **LAST_UPDATED**: \n"));
        assert!(body.contains("- **SOURCE**: \n"));
        assert!(body.ends_with("\n---\n\nHello"));
    }

    #[test]
    fn required_identifier_skips_empty_rows() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(
            tmp.path(),
            "mule.csv",
            b"Mule Jira Issue,Notes\nMULE-42,fix bug\n,ignored\n",
        );
        let out = tmp.path().join("out");

        let report = run(&input, &out).expect("run");
        assert_eq!(report.documents_written(), 1);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(file_names(&out), vec!["MULE-42.md"]);
        assert!(read(&out, "MULE-42.md").contains("**Notes:** fix bug"));
    }

    #[test]
    fn unrecognized_header_uses_first_non_empty_cell() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path(), "plain.csv", b"Foo,Bar\n,value2\n");
        let out = tmp.path().join("out");

        let report = run(&input, &out).expect("run");
        assert_eq!(report.schema, SchemaKind::Positional);
        assert_eq!(file_names(&out), vec!["value2.md"]);
        assert_eq!(
            read(&out, "value2.md"),
            "# value2\n\n**Foo:** \n\n**Bar:** value2\n\n"
        );
    }

    #[test]
    fn positional_renders_every_row() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path(), "rows.csv", b"A,B\nx,1\n,y\n,\nz,\n");
        let out = tmp.path().join("out");

        let report = run(&input, &out).expect("run");
        assert_eq!(report.documents_written(), 4);
        assert_eq!(report.rows_skipped, 0);
        assert_eq!(file_names(&out), vec!["row.md", "x.md", "y.md", "z.md"]);
    }

    #[test]
    fn colliding_names_overwrite() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path(), "dup.csv", b"Name,Value\nsame,first\nsame,second\n");
        let out = tmp.path().join("out");

        let report = run(&input, &out).expect("run");
        assert_eq!(report.documents_written(), 2);
        assert_eq!(file_names(&out), vec!["same.md"]);
        assert!(read(&out, "same.md").contains("**Value:** second"));
    }

    #[test]
    fn stale_files_from_earlier_runs_persist() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let out = tmp.path().join("out");
        fs::create_dir_all(&out).expect("mkdir");
        fs::write(out.join("old.md"), "stale").expect("write");

        let input = write_input(tmp.path(), "new.csv", b"ID\nfresh\n");
        run(&input, &out).expect("run");
        assert_eq!(file_names(&out), vec!["fresh.md", "old.md"]);
    }

    // --- Fixtures ---

    #[test]
    fn tsv_fixture_converts_kb_rows() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let report = run(&fixture_path("csv/kb_export.tsv"), tmp.path()).expect("run");

        assert_eq!(report.delimiter.delimiter, b'\t');
        assert_eq!(report.schema, SchemaKind::KnowledgeBase);
        assert_eq!(report.documents_written(), 2);
        assert_eq!(report.rows_skipped, 1);

        let body = read(tmp.path(), "Resetting a Switch.md");
        assert!(body.contains("- **FULL_PATH**: /hardware/switches\n"));
        assert!(body.contains("Hold the reset button"));
        assert!(!body.contains("<li>"));
        assert!(!body.contains("\n\n\n"));

        let body = read(tmp.path(), "VLAN _ Trunk Basics.md");
        assert!(body.contains("Tagged & untagged"));
    }

    #[test]
    fn semicolon_fixture_uses_name_column() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let report = run(&fixture_path("csv/contacts_semicolon.csv"), tmp.path()).expect("run");

        assert_eq!(report.delimiter.delimiter, b';');
        assert_eq!(
            report.schema,
            SchemaKind::Identified {
                id_field: "Name".into(),
                required: false
            }
        );
        let body = read(tmp.path(), "Ada Lovelace.md");
        assert!(body.contains("**Email:** ada@example.com"));
        assert!(body.contains("**Note:** likes \"engines\"; and maths"));
    }

    #[test]
    fn latin1_fixture_is_decoded() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let report = run(&fixture_path("csv/latin1_issues.csv"), tmp.path()).expect("run");

        assert_eq!(report.encoding.label(), "windows-1252");
        assert_eq!(
            report.schema,
            SchemaKind::Identified {
                id_field: "Issue".into(),
                required: false
            }
        );
        let body = read(tmp.path(), "ISS-1.md");
        assert!(body.contains("**Summary:** Café menu crème brûlée"));
    }

    // --- Failures and edge cases ---

    #[test]
    fn missing_input_is_a_config_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = run(&tmp.path().join("nope.csv"), tmp.path()).unwrap_err();
        assert!(matches!(err, TabledownError::Config { .. }));
        assert!(err.to_string().contains("Input file does not exist"));
    }

    #[test]
    fn unwritable_output_dir_is_an_io_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path(), "in.csv", b"ID\n1\n");
        let blocker = write_input(tmp.path(), "blocker", b"");

        let err = run(&input, &blocker.join("out")).unwrap_err();
        assert!(matches!(err, TabledownError::Io { .. }));
    }

    #[test]
    fn render_failure_aborts_remaining_rows() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path(), "nul.csv", b"ID\nfirst\nbad\0id\nthird\n");
        let out = tmp.path().join("out");

        let err = run(&input, &out).unwrap_err();
        assert!(matches!(err, TabledownError::Render { row: 2, .. }));
        assert_eq!(file_names(&out), vec!["first.md"]);
    }

    /// Yields `data`, then fails every later read.
    struct FailingSource {
        data: &'static [u8],
        pos: usize,
    }

    impl Read for FailingSource {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos < self.data.len() {
                let n = buf.len().min(self.data.len() - self.pos);
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            } else {
                Err(std::io::Error::other("device went away"))
            }
        }
    }

    #[test]
    fn read_failure_mid_stream_aborts_with_row_number() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let emitter = FileEmitter::create(tmp.path().join("out")).expect("emitter");
        let source = FailingSource {
            data: b"ID\nfirst\n",
            pos: 0,
        };

        let result = render_rows(source, b',', &emitter, &NamingConfig::default(), &SilentProgress);
        let err = result.err().expect("read failure should abort");
        assert!(matches!(err, TabledownError::Csv { row: 2, .. }), "got {err:?}");
        assert!(err.to_string().contains("device went away"));
        assert_eq!(file_names(emitter.dir()), vec!["first.md"]);
    }

    #[test]
    fn cp1251_input_is_streamed_and_decoded() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let text = "Name,Описание\nКоммутатор,Настройка сетевого оборудования и маршрутизации\n\
                    Сервер,Проверка подключения к базе данных и резервного копирования\n";
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode(text);
        let input = write_input(tmp.path(), "ru.csv", &bytes);
        let out = tmp.path().join("out");

        let report = run(&input, &out).expect("run");
        assert_eq!(report.encoding.label(), "windows-1251");
        assert_eq!(file_names(&out), vec!["Коммутатор.md", "Сервер.md"]);
        assert!(read(&out, "Сервер.md").contains("**Описание:** Проверка подключения"));
    }

    #[test]
    fn long_input_streams_past_the_samples() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut content = String::from("ID;Value\n");
        for i in 0..5_000 {
            content.push_str(&format!("row-{i};value {i}\n"));
        }
        let input = write_input(tmp.path(), "long.csv", content.as_bytes());
        let out = tmp.path().join("out");

        let report = run(&input, &out).expect("run");
        assert_eq!(report.delimiter.delimiter, b';');
        assert!(!report.delimiter.fell_back);
        assert_eq!(report.documents_written(), 5_000);
        assert!(read(&out, "row-4999.md").contains("**Value:** value 4999"));
    }

    #[test]
    fn empty_input_writes_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path(), "empty.csv", b"");
        let out = tmp.path().join("out");

        let report = run(&input, &out).expect("run");
        assert_eq!(report.schema, SchemaKind::Positional);
        assert_eq!(report.documents_written(), 0);
        assert!(out.is_dir());
    }

    #[test]
    fn progress_sees_phases_and_writes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let input = write_input(tmp.path(), "in.csv", b"Subject,Body\na,1\nb,2\n");
        let config = PipelineConfig::new(&AppConfig::default(), &input, tmp.path().join("out"))
            .expect("config");

        let progress = RecordingProgress::default();
        convert_file(&config, &progress).expect("run");

        assert_eq!(
            *progress.phases.borrow(),
            vec!["Detecting encoding", "Detecting delimiter", "Rendering rows"]
        );
        assert_eq!(*progress.writes.borrow(), 2);
    }

    #[test]
    fn leading_chars_respects_char_boundaries() {
        assert_eq!(leading_chars("abc", 10), ("abc", false));
        assert_eq!(leading_chars("héllo", 2), ("h", true));
        assert_eq!(leading_chars("héllo", 3), ("hé", true));
    }
}
