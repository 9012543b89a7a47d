//! Analytics engine using DuckDB for OLAP queries over the normalized table.

use crate::error::{AnalyticsError, Result};
use crash_domain::{
    Category, CategoryCount, NormalizedRecord, Season, UNKNOWN_LABEL, YearlyCount, YearlySeries,
};
use duckdb::{Connection, params};
use tracing::{debug, info};

/// DuckDB-based engine answering read-only views over crash records.
///
/// The `incidents` table is filled once from an immutable normalized table;
/// every view afterwards is a plain `SELECT`.
pub struct AnalyticsEngine {
    pub(crate) conn: Connection,
}

impl AnalyticsEngine {
    /// Create a new, empty in-memory analytics engine.
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let engine = Self { conn };
        engine.initialize_schema()?;
        Ok(engine)
    }

    /// Create an in-memory engine loaded with the given records.
    pub fn from_records(records: &[NormalizedRecord]) -> Result<Self> {
        let engine = Self::new_in_memory()?;
        let count = engine.ingest_records(records)?;
        info!(rows = count, "Analytics engine loaded");
        Ok(engine)
    }

    /// Initialize the analytics schema.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            -- One row per normalized incident, in source order
            CREATE TABLE IF NOT EXISTS incidents (
                row_id BIGINT PRIMARY KEY,
                incident_date VARCHAR,
                year INTEGER,
                season VARCHAR,
                country VARCHAR,
                region VARCHAR,
                aircraft VARCHAR,
                operator VARCHAR,
                schedule VARCHAR,
                total_on_board BIGINT,
                survivors VARCHAR,
                total_fatalities BIGINT,
                crash_cause VARCHAR
            );

            CREATE INDEX IF NOT EXISTS idx_incidents_year ON incidents(year);
            ",
        )?;
        Ok(())
    }

    /// Append records to the `incidents` table, continuing the row order.
    pub fn ingest_records(&self, records: &[NormalizedRecord]) -> Result<usize> {
        let offset = self.total_count()?;
        let mut stmt = self.conn.prepare(
            r"
            INSERT INTO incidents (
                row_id, incident_date, year, season, country, region, aircraft,
                operator, schedule, total_on_board, survivors, total_fatalities, crash_cause
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )?;

        for (index, record) in records.iter().enumerate() {
            let row_id = offset
                + i64::try_from(index)
                    .map_err(|e| AnalyticsError::Conversion(e.to_string()))?;
            stmt.execute(params![
                row_id,
                record.date.map(|d| d.format("%Y-%m-%d").to_string()),
                record.year(),
                record.season.map(|s| s.as_str()),
                record.country,
                record.region,
                record.aircraft,
                record.operator,
                record.schedule,
                record.total_on_board,
                record.survivors,
                record.total_fatalities,
                record.crash_cause,
            ])?;
        }
        Ok(records.len())
    }

    /// Number of rows in the table.
    pub fn total_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Number of rows whose date is missing, and so belong to no year.
    pub fn undated_count(&self) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM incidents WHERE year IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Incident counts per calendar year, ascending.
    ///
    /// Years between the first and last observed year with no incidents are
    /// present with a count of 0. Undated rows are not counted.
    pub fn yearly_counts(&self) -> Result<Vec<YearlyCount>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT year, COUNT(*) AS total
            FROM incidents
            WHERE year IS NOT NULL
            GROUP BY year
            ORDER BY year
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(YearlyCount {
                year: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        let observed = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(observed_years = observed.len(), "Yearly counts queried");
        Ok(resample_yearly(&observed))
    }

    /// Yearly counts as a validated, gap-free series.
    pub fn yearly_series(&self) -> Result<YearlySeries> {
        Ok(YearlySeries::new(self.yearly_counts()?)?)
    }

    /// Incident counts per season, in calendar order.
    ///
    /// Undated rows form an `Unknown` bucket after the four seasons.
    pub fn seasonal_distribution(&self) -> Result<Vec<CategoryCount>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT COALESCE(season, 'Unknown') AS label, COUNT(*) AS total
            FROM incidents
            GROUP BY label
            ",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        let mut counts = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        counts.sort_by_key(|(label, _)| {
            label
                .parse::<Season>()
                .map_or(Season::ALL.len(), |season| season as usize)
        });
        Ok(with_shares(counts))
    }

    /// Incident counts for every value of a category.
    ///
    /// Ordered by count descending; equal counts keep first-seen order.
    /// Missing values are counted under `Unknown`, so counts sum to the
    /// table's row count.
    pub fn category_counts(&self, category: Category) -> Result<Vec<CategoryCount>> {
        let counts = self.ranked_counts(category, None)?;
        Ok(with_shares(counts))
    }

    /// The `n` most frequent values of a category, ascending by count.
    ///
    /// Shares are relative to the `n` values shown.
    pub fn category_top_n(&self, category: Category, n: usize) -> Result<Vec<CategoryCount>> {
        if n == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "top-N size must be at least 1".to_string(),
            ));
        }
        let mut counts = self.ranked_counts(category, Some(n))?;
        counts.reverse();
        Ok(with_shares(counts))
    }

    fn ranked_counts(&self, category: Category, limit: Option<usize>) -> Result<Vec<(String, i64)>> {
        let column = category.column();
        let limit_clause = match limit {
            Some(n) => format!("LIMIT {n}"),
            None => String::new(),
        };
        let query = format!(
            r"
            SELECT
                COALESCE({column}, '{UNKNOWN_LABEL}') AS label,
                COUNT(*) AS total,
                MIN(row_id) AS first_seen
            FROM incidents
            GROUP BY label
            ORDER BY total DESC, first_seen ASC
            {limit_clause}
            "
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }
}

/// Fill the gaps between observed years with zero counts.
///
/// `observed` must be sorted by year.
pub fn resample_yearly(observed: &[YearlyCount]) -> Vec<YearlyCount> {
    let (Some(first), Some(last)) = (observed.first(), observed.last()) else {
        return Vec::new();
    };

    let mut filled = Vec::with_capacity(usize::try_from(last.year - first.year + 1).unwrap_or(0));
    let mut observed = observed.iter().peekable();
    for year in first.year..=last.year {
        let count = match observed.peek() {
            Some(point) if point.year == year => {
                let count = point.count;
                observed.next();
                count
            }
            _ => 0,
        };
        filled.push(YearlyCount { year, count });
    }
    filled
}

/// Percentage of `value` within `total`; 0 for an empty view.
#[allow(clippy::cast_precision_loss)]
pub fn share_pct(value: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        value as f64 / total as f64 * 100.0
    }
}

/// Annotate counts with their share of the view's own total.
pub(crate) fn with_shares(counts: Vec<(String, i64)>) -> Vec<CategoryCount> {
    let total: i64 = counts.iter().map(|(_, n)| n).sum();
    counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            share_pct: share_pct(count, total),
            label,
            count,
        })
        .collect()
}
