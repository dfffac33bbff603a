//! Loading the delimited source into an in-memory table.
//!
//! The source is either fetched with one blocking HTTP GET or read from a
//! local file; no retries are attempted.

use std::path::Path;

use incident_core::settings::DataSource;
use incident_core::{PipelineError, Result};
use tracing::{debug, info};

// ── RawTable ──────────────────────────────────────────────────────────────────

/// The source exactly as published: header names and string cells in source
/// order. Every row has as many cells as the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load `source` and parse it as delimited text.
pub fn load_table(source: &DataSource, delimiter: u8) -> Result<RawTable> {
    info!("Loading incidents from {}", source);
    let body = match source {
        DataSource::Url(url) => fetch_bytes(url)?,
        DataSource::Path(path) => read_bytes(path)?,
    };
    let table = parse_delimited(&body, delimiter)?;
    info!(
        "Loaded {} rows x {} columns",
        table.rows.len(),
        table.headers.len()
    );
    Ok(table)
}

/// Parse `body` into a [`RawTable`].
///
/// Fails with [`PipelineError::Format`] on an empty header, invalid UTF-8 or
/// any row whose width differs from the header's.
pub fn parse_delimited(body: &[u8], delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(body);

    let headers: Vec<String> = reader
        .headers()
        .map_err(format_error)?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(PipelineError::Format {
            line: Some(1),
            message: "source has no header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(format_error)?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!("Parsed {} data rows", rows.len());
    Ok(RawTable { headers, rows })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn fetch_bytes(url: &str) -> Result<Vec<u8>> {
    let fetch_error = |reason: String| PipelineError::Fetch {
        source_name: url.to_string(),
        reason,
    };

    let response = reqwest::blocking::get(url).map_err(|e| fetch_error(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("HTTP {}", status)));
    }

    let body = response.bytes().map_err(|e| fetch_error(e.to_string()))?;
    debug!("Fetched {} bytes from {}", body.len(), url);
    Ok(body.to_vec())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| PipelineError::Fetch {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn format_error(err: csv::Error) -> PipelineError {
    PipelineError::Format {
        line: err.position().map(|p| p.line()),
        message: err.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_delimited_preserves_header_and_order() {
        let body = b"A,B,C\n1,2,3\n4,5,6\n";
        let table = parse_delimited(body, b',').unwrap();
        assert_eq!(table.headers, vec!["A", "B", "C"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["4", "5", "6"]);
    }

    #[test]
    fn test_parse_delimited_quoted_fields() {
        let body = b"A,B\n\"STATEN ISLAND\",\"x, y\"\n";
        let table = parse_delimited(body, b',').unwrap();
        assert_eq!(table.rows[0], vec!["STATEN ISLAND", "x, y"]);
    }

    #[test]
    fn test_parse_delimited_custom_delimiter() {
        let body = b"A;B\n1;2\n";
        let table = parse_delimited(body, b';').unwrap();
        assert_eq!(table.headers, vec!["A", "B"]);
        assert_eq!(table.rows[0], vec!["1", "2"]);
    }

    #[test]
    fn test_parse_delimited_strips_bom() {
        let body = "\u{feff}INCIDENT_KEY,OCCUR_DATE\n1,01/01/2020\n".as_bytes();
        let table = parse_delimited(body, b',').unwrap();
        assert_eq!(table.headers[0], "INCIDENT_KEY");
    }

    #[test]
    fn test_parse_delimited_ragged_row_is_format_error() {
        let body = b"A,B,C\n1,2,3\n4,5\n";
        let err = parse_delimited(body, b',').unwrap_err();
        match err {
            PipelineError::Format { line, .. } => assert_eq!(line, Some(3)),
            other => panic!("expected Format error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_delimited_empty_body_is_format_error() {
        let err = parse_delimited(b"", b',').unwrap_err();
        assert!(matches!(err, PipelineError::Format { .. }));
    }

    #[test]
    fn test_parse_delimited_header_only_is_empty_table() {
        let table = parse_delimited(b"A,B\n", b',').unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_table_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "A,B").unwrap();
        writeln!(file, "1,2").unwrap();
        let source = DataSource::Path(file.path().to_path_buf());
        let table = load_table(&source, b',').unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_load_table_missing_path_is_fetch_error() {
        let source = DataSource::Path("/definitely/not/here.csv".into());
        let err = load_table(&source, b',').unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    #[test]
    fn test_load_table_unreachable_url_is_fetch_error() {
        let source = DataSource::Url("http://127.0.0.1:1/rows.csv".to_string());
        let err = load_table(&source, b',').unwrap_err();
        assert!(matches!(err, PipelineError::Fetch { .. }));
    }

    // ── HTTP sources ──────────────────────────────────────────────────────────

    /// Answer a single request on a local port with `response`; returns the
    /// URL to fetch.
    fn serve_once(response: &'static str) -> String {
        use std::io::{BufRead, BufReader};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}/rows.csv")
    }

    #[test]
    fn test_load_table_http_404_is_fetch_error() {
        let url = serve_once("HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        match load_table(&DataSource::Url(url.clone()), b',') {
            Err(PipelineError::Fetch { source_name, reason }) => {
                assert_eq!(source_name, url);
                assert!(reason.contains("HTTP 404"), "{reason}");
            }
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_table_from_url() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/csv\r\nContent-Length: 12\r\nConnection: close\r\n\r\nA,B\n1,2\n3,4\n",
        );
        let table = load_table(&DataSource::Url(url), b',').unwrap();
        assert_eq!(table.headers, vec!["A", "B"]);
        assert_eq!(table.rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    }
}
