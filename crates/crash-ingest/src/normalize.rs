//! Row-level derivation from raw to normalized records.

use crash_domain::{NormalizedRecord, RawIncident, Season};
use serde::{Deserialize, Serialize};

use crate::parse::{clean_text, parse_count, parse_date};

/// Outcome counters of one normalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeSummary {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_written: usize,
    pub undated_rows: usize,
    pub missing_total_on_board: usize,
}

/// Sum of crew and passengers; missing if either side is missing.
pub fn total_on_board(crew: Option<i64>, pax: Option<i64>) -> Option<i64> {
    crew?.checked_add(pax?)
}

/// Derive one normalized record from a raw row.
pub fn normalize_record(raw: &RawIncident) -> NormalizedRecord {
    let date = parse_date(raw.date.as_deref());
    let crew = parse_count(raw.crew_on_board.as_deref());
    let pax = parse_count(raw.pax_on_board.as_deref());

    NormalizedRecord {
        date,
        season: date.map(Season::from_date),
        country: clean_text(raw.country.as_deref()),
        region: clean_text(raw.region.as_deref()),
        aircraft: clean_text(raw.aircraft.as_deref()),
        operator: clean_text(raw.operator.as_deref()),
        schedule: clean_text(raw.schedule.as_deref()),
        total_on_board: total_on_board(crew, pax),
        survivors: clean_text(raw.survivors.as_deref()),
        total_fatalities: parse_count(raw.total_fatalities.as_deref()),
        crash_cause: clean_text(raw.crash_cause.as_deref()),
    }
}

/// Normalize a whole raw table, preserving row order.
pub fn normalize_records(raw: &[RawIncident]) -> (Vec<NormalizedRecord>, NormalizeSummary) {
    let records: Vec<NormalizedRecord> = raw.iter().map(normalize_record).collect();

    let summary = NormalizeSummary {
        rows_read: raw.len(),
        rows_dropped: 0,
        rows_written: records.len(),
        undated_rows: records.iter().filter(|r| r.date.is_none()).count(),
        missing_total_on_board: records.iter().filter(|r| r.total_on_board.is_none()).count(),
    };

    (records, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw(date: &str, crew: &str, pax: &str) -> RawIncident {
        RawIncident {
            date: Some(date.to_string()),
            country: Some("Peru".to_string()),
            region: Some("South America".to_string()),
            aircraft: Some("Boeing 727".to_string()),
            operator: Some("Faucett".to_string()),
            schedule: Some("Lima - Cuzco".to_string()),
            crew_on_board: Some(crew.to_string()),
            pax_on_board: Some(pax.to_string()),
            survivors: Some("No".to_string()),
            total_fatalities: Some("12".to_string()),
            crash_cause: Some("Technical failure".to_string()),
        }
    }

    #[test]
    fn test_valid_and_invalid_dates() {
        let (records, summary) = normalize_records(&[raw("1995-03-04", "4", "8"), raw("1995-13-99", "4", "8")]);

        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(1995, 3, 4));
        assert_eq!(records[0].season, Some(Season::Spring));
        assert_eq!(records[1].date, None);
        assert_eq!(records[1].season, None);
        assert_eq!(summary.undated_rows, 1);
        assert_eq!(summary.rows_written, 2);
    }

    #[test]
    fn test_total_on_board_sums_when_both_numeric() {
        let record = normalize_record(&raw("2001-07-01", "5", "120"));
        assert_eq!(record.total_on_board, Some(125));
        assert_eq!(record.total_fatalities, Some(12));
    }

    #[test]
    fn test_total_on_board_missing_when_either_missing() {
        for (crew, pax) in [("five", "120"), ("5", "?"), ("", "3"), ("2", "2.5")] {
            let record = normalize_record(&raw("2001-07-01", crew, pax));
            assert_eq!(record.total_on_board, None, "crew={crew:?} pax={pax:?}");
        }
        assert_eq!(total_on_board(Some(i64::MAX), Some(1)), None);
    }

    #[test]
    fn test_non_numeric_fatalities_are_missing_not_zero() {
        let mut row = raw("2001-07-01", "1", "1");
        row.total_fatalities = Some("unknown".to_string());
        assert_eq!(normalize_record(&row).total_fatalities, None);
    }

    #[test]
    fn test_blank_text_becomes_missing() {
        let mut row = raw("2001-07-01", "1", "1");
        row.country = Some("   ".to_string());
        row.operator = None;
        let record = normalize_record(&row);
        assert_eq!(record.country, None);
        assert_eq!(record.operator, None);
        assert_eq!(record.aircraft.as_deref(), Some("Boeing 727"));
    }

    #[test]
    fn test_season_matches_date_for_every_row() {
        let rows: Vec<RawIncident> = (1..=12)
            .map(|m| raw(&format!("1980-{m:02}-15"), "1", "1"))
            .collect();
        let (records, _) = normalize_records(&rows);
        assert!(records.iter().all(NormalizedRecord::season_consistent));
        assert_eq!(records[0].season, Some(Season::Winter));
        assert_eq!(records[11].season, Some(Season::Winter));
        assert_eq!(records[8].season, Some(Season::Autumn));
    }
}
