//! Tabular artifacts: the raw source CSV and the processed CSV.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crash_domain::{NormalizedRecord, RawIncident, Season};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};
use crate::normalize::{NormalizeSummary, normalize_records};
use crate::parse::{clean_text, parse_count, parse_date};

/// Columns the raw source table must carry. Extra columns are ignored.
pub const RAW_COLUMNS: [&str; 11] = [
    "Date",
    "Country",
    "Region",
    "Aircraft",
    "Operator",
    "Schedule",
    "Crew on board",
    "Pax on board",
    "Survivors",
    "Total fatalities",
    "Crash cause",
];

/// Exact column layout of the processed table.
pub const PROCESSED_COLUMNS: [&str; 11] = [
    "Date",
    "Season",
    "Country",
    "Region",
    "Aircraft",
    "Operator",
    "Schedule",
    "Total on board",
    "Survivors",
    "Total fatalities",
    "Crash cause",
];

/// Written in place of a missing total-on-board so the column never holds a blank.
pub const MISSING_PLACEHOLDER: &str = "NA";

/// Raw rows read from the source table.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub records: Vec<RawIncident>,
    /// Rows that could not be decoded into a record
    pub dropped: usize,
}

#[derive(Debug, Deserialize)]
struct ProcessedRow {
    #[serde(rename = "Date", default)]
    date: Option<String>,
    #[serde(rename = "Season", default)]
    season: Option<String>,
    #[serde(rename = "Country", default)]
    country: Option<String>,
    #[serde(rename = "Region", default)]
    region: Option<String>,
    #[serde(rename = "Aircraft", default)]
    aircraft: Option<String>,
    #[serde(rename = "Operator", default)]
    operator: Option<String>,
    #[serde(rename = "Schedule", default)]
    schedule: Option<String>,
    #[serde(rename = "Total on board", default)]
    total_on_board: Option<String>,
    #[serde(rename = "Survivors", default)]
    survivors: Option<String>,
    #[serde(rename = "Total fatalities", default)]
    total_fatalities: Option<String>,
    #[serde(rename = "Crash cause", default)]
    crash_cause: Option<String>,
}

impl From<ProcessedRow> for NormalizedRecord {
    fn from(row: ProcessedRow) -> Self {
        let date = parse_date(row.date.as_deref());
        let season = clean_text(row.season.as_deref())
            .and_then(|s| s.parse::<Season>().ok())
            .or_else(|| date.map(Season::from_date));

        Self {
            date,
            season,
            country: clean_text(row.country.as_deref()),
            region: clean_text(row.region.as_deref()),
            aircraft: clean_text(row.aircraft.as_deref()),
            operator: clean_text(row.operator.as_deref()),
            schedule: clean_text(row.schedule.as_deref()),
            total_on_board: parse_count(row.total_on_board.as_deref()),
            survivors: clean_text(row.survivors.as_deref()),
            total_fatalities: parse_count(row.total_fatalities.as_deref()),
            crash_cause: clean_text(row.crash_cause.as_deref()),
        }
    }
}

fn open_input(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|source| IngestError::InputMissing {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file))
}

fn check_columns(
    path: &Path,
    reader: &mut csv::Reader<File>,
    required: &[&str],
) -> Result<csv::StringRecord> {
    let headers = reader.headers().map_err(|source| IngestError::Csv {
        path: path.to_path_buf(),
        stage: "read headers",
        source,
    })?;

    let missing: Vec<String> = required
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| (*column).to_string())
        .collect();

    if missing.is_empty() {
        Ok(headers.clone())
    } else {
        Err(IngestError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        })
    }
}

/// Decode every cell of a row; cells that are not valid UTF-8 become empty.
fn decode_cells(record: &csv::ByteRecord) -> (csv::StringRecord, usize) {
    let mut invalid = 0;
    let decoded = record
        .iter()
        .map(|cell| {
            std::str::from_utf8(cell).unwrap_or_else(|_| {
                invalid += 1;
                ""
            })
        })
        .collect();
    (decoded, invalid)
}

fn read_rows<T>(path: &Path, required: &[&str]) -> Result<(Vec<T>, usize)>
where
    T: for<'de> Deserialize<'de>,
{
    let mut reader = open_input(path)?;
    let headers = check_columns(path, &mut reader, required)?;

    let mut rows = Vec::new();
    let mut dropped = 0;
    for (index, result) in reader.byte_records().enumerate() {
        // header occupies line 1
        let line = index + 2;
        let record = result.map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            stage: "read rows",
            source,
        })?;

        let (record, invalid) = decode_cells(&record);
        if invalid > 0 {
            warn!(line, cells = invalid, path = %path.display(), "Treating non-UTF-8 cells as missing");
        }

        match record.deserialize::<T>(Some(&headers)) {
            Ok(row) => rows.push(row),
            Err(err) => {
                warn!(line, error = %err, path = %path.display(), "Dropping undecodable row");
                dropped += 1;
            }
        }
    }
    Ok((rows, dropped))
}

/// Read the raw source table.
///
/// # Errors
///
/// Fails if the file is absent or unreadable, or lacks a required column.
pub fn read_raw(path: &Path) -> Result<RawTable> {
    let (records, dropped) = read_rows::<RawIncident>(path, &RAW_COLUMNS)?;
    debug!(rows = records.len(), dropped, path = %path.display(), "Read raw table");
    Ok(RawTable { records, dropped })
}

/// Load the processed table written by [`write_normalized`].
///
/// # Errors
///
/// Fails if the file is absent or unreadable, or lacks a processed column.
pub fn load_normalized(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let (rows, dropped) = read_rows::<ProcessedRow>(path, &PROCESSED_COLUMNS)?;
    let records: Vec<NormalizedRecord> = rows.into_iter().map(NormalizedRecord::from).collect();
    info!(rows = records.len(), dropped, path = %path.display(), "Loaded processed table");
    Ok(records)
}

fn to_row(record: &NormalizedRecord) -> [String; 11] {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        record
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        record.season.map(|s| s.as_str().to_string()).unwrap_or_default(),
        text(&record.country),
        text(&record.region),
        text(&record.aircraft),
        text(&record.operator),
        text(&record.schedule),
        record
            .total_on_board
            .map_or_else(|| MISSING_PLACEHOLDER.to_string(), |n| n.to_string()),
        text(&record.survivors),
        record.total_fatalities.map(|n| n.to_string()).unwrap_or_default(),
        text(&record.crash_cause),
    ]
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_rows(tmp: &Path, path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    let csv_err = |source| IngestError::Csv {
        path: path.to_path_buf(),
        stage: "write",
        source,
    };

    let file = File::create(tmp).map_err(|source| IngestError::Io {
        path: tmp.to_path_buf(),
        source,
    })?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(PROCESSED_COLUMNS).map_err(csv_err)?;
    for record in records {
        writer.write_record(&to_row(record)).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| IngestError::Io {
        path: tmp.to_path_buf(),
        source,
    })
}

/// Write the processed table.
///
/// The table is written next to `path` and renamed into place, so readers
/// never observe a partial file.
///
/// # Errors
///
/// Fails if the directory or file cannot be written.
pub fn write_normalized(path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| IngestError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = tmp_path(path);
    if let Err(err) = write_rows(&tmp, path, records) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    fs::rename(&tmp, path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Read the raw table, normalize it, and persist the processed table.
///
/// # Errors
///
/// Fails without writing anything if the raw table is absent or unreadable.
pub fn run_normalizer(raw_path: &Path, processed_path: &Path) -> Result<NormalizeSummary> {
    info!(raw = %raw_path.display(), "Normalizing raw crash records");

    let raw = read_raw(raw_path)?;
    let (records, mut summary) = normalize_records(&raw.records);
    summary.rows_read += raw.dropped;
    summary.rows_dropped = raw.dropped;

    if summary.undated_rows > 0 {
        warn!(undated = summary.undated_rows, "Rows with unparseable dates kept as undated");
    }

    write_normalized(processed_path, &records)?;

    info!(
        rows_read = summary.rows_read,
        rows_written = summary.rows_written,
        rows_dropped = summary.rows_dropped,
        missing_total_on_board = summary.missing_total_on_board,
        processed = %processed_path.display(),
        "Processed table written"
    );
    Ok(summary)
}
