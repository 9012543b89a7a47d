//! # Crash Records - Domain Model
//!
//! Core record types, enums, and aggregate view rows for the crash records
//! pipeline. These types are the single source of truth across all layers:
//! ingestion, analytics, forecasting, and the dashboard facade.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Label used for the bucket collecting missing or placeholder category values.
pub const UNKNOWN_LABEL: &str = "Unknown";

// =============================================================================
// ENUMS
// =============================================================================

/// Meteorological season of an incident, derived from the month of its date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Seasons in calendar order, starting with the season that opens the year.
    pub const ALL: [Self; 4] = [Self::Winter, Self::Spring, Self::Summer, Self::Autumn];

    /// Map a calendar month (1-12) to its season.
    ///
    /// Returns `None` for anything outside 1..=12.
    #[must_use]
    pub const fn from_month(month: u32) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Self::Winter),
            3..=5 => Some(Self::Spring),
            6..=8 => Some(Self::Summer),
            9..=11 => Some(Self::Autumn),
            _ => None,
        }
    }

    /// Season of a calendar date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        // chrono months are always 1..=12
        Self::from_month(date.month()).unwrap_or(Self::Winter)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Winter => "Winter",
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Autumn => "Autumn",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Winter" => Ok(Self::Winter),
            "Spring" => Ok(Self::Spring),
            "Summer" => Ok(Self::Summer),
            "Autumn" => Ok(Self::Autumn),
            other => Err(DomainError::InvalidSeason(other.to_string())),
        }
    }
}

/// Categorical dimension of the normalized table that views can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Country,
    Region,
    Aircraft,
    Operator,
    /// Schedule / route description, shown as "destination" on the dashboard
    Schedule,
    Cause,
}

impl Category {
    /// Column holding this dimension in the analytics store.
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Region => "region",
            Self::Aircraft => "aircraft",
            Self::Operator => "operator",
            Self::Schedule => "schedule",
            Self::Cause => "crash_cause",
        }
    }

    /// Header of this dimension in the tabular artifacts.
    pub const fn header(&self) -> &'static str {
        match self {
            Self::Country => "Country",
            Self::Region => "Region",
            Self::Aircraft => "Aircraft",
            Self::Operator => "Operator",
            Self::Schedule => "Schedule",
            Self::Cause => "Crash cause",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "country" | "location" => Ok(Self::Country),
            "region" => Ok(Self::Region),
            "aircraft" => Ok(Self::Aircraft),
            "operator" => Ok(Self::Operator),
            "schedule" | "destination" => Ok(Self::Schedule),
            "cause" | "crash_cause" | "crash cause" => Ok(Self::Cause),
            other => Err(DomainError::UnknownCategory(other.to_string())),
        }
    }
}

// =============================================================================
// RECORD TYPES
// =============================================================================

/// Raw incident row as it appears in the source table.
///
/// Every field is kept as optional text; coercion happens during
/// normalization so a malformed cell never aborts a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIncident {
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
    #[serde(rename = "Country", default)]
    pub country: Option<String>,
    #[serde(rename = "Region", default)]
    pub region: Option<String>,
    #[serde(rename = "Aircraft", default)]
    pub aircraft: Option<String>,
    #[serde(rename = "Operator", default)]
    pub operator: Option<String>,
    #[serde(rename = "Schedule", default)]
    pub schedule: Option<String>,
    #[serde(rename = "Crew on board", default)]
    pub crew_on_board: Option<String>,
    #[serde(rename = "Pax on board", default)]
    pub pax_on_board: Option<String>,
    #[serde(rename = "Survivors", default)]
    pub survivors: Option<String>,
    #[serde(rename = "Total fatalities", default)]
    pub total_fatalities: Option<String>,
    #[serde(rename = "Crash cause", default)]
    pub crash_cause: Option<String>,
}

/// Analysis-ready incident row.
///
/// `None` is the explicit missing marker; it is never conflated with zero or
/// an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub date: Option<NaiveDate>,
    pub season: Option<Season>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub aircraft: Option<String>,
    pub operator: Option<String>,
    pub schedule: Option<String>,
    pub total_on_board: Option<i64>,
    pub survivors: Option<String>,
    pub total_fatalities: Option<i64>,
    pub crash_cause: Option<String>,
}

impl NormalizedRecord {
    /// Calendar year of the incident, if the date is known.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }

    /// Whether the stored season agrees with the one derived from the date.
    #[must_use]
    pub fn season_consistent(&self) -> bool {
        self.season == self.date.map(Season::from_date)
    }
}

// =============================================================================
// AGGREGATE VIEW TYPES
// =============================================================================

/// Incident count for one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyCount {
    pub year: i32,
    pub count: i64,
}

/// Chronologically ordered, gap-free yearly incident series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlySeries {
    points: Vec<YearlyCount>,
}

impl YearlySeries {
    /// Build a series, checking that years are strictly increasing by one.
    pub fn new(points: Vec<YearlyCount>) -> Result<Self, DomainError> {
        for pair in points.windows(2) {
            let expected = pair[0].year + 1;
            if pair[1].year != expected {
                return Err(DomainError::NonContiguousSeries {
                    expected,
                    found: pair[1].year,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[YearlyCount] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.points.first().map(|p| p.year)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.points.last().map(|p| p.year)
    }

    /// Counts as floating point observations.
    #[allow(clippy::cast_precision_loss)]
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.count as f64).collect()
    }

    pub fn total(&self) -> i64 {
        self.points.iter().map(|p| p.count).sum()
    }
}

/// Row count for one category value, with its share of the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: i64,
    pub share_pct: f64,
}

/// Fatality sum for one category value, with its share of the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasualtyTotal {
    pub label: String,
    pub fatalities: i64,
    pub share_pct: f64,
}

/// Fatality sum for one (cause, season) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalCasualties {
    pub cause: String,
    pub season: String,
    pub fatalities: i64,
}

/// People killed and people on board, summed per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualCasualties {
    pub year: i32,
    pub total_fatalities: i64,
    pub total_on_board: i64,
}

/// Least-squares line through the yearly counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub r_value: f64,
}

impl TrendLine {
    #[must_use]
    pub fn at(&self, year: i32) -> f64 {
        self.slope * f64::from(year) + self.intercept
    }
}

/// One forecasted year: point estimate and symmetric display error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub year: i32,
    pub estimate: f64,
    pub error: f64,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level errors
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid season: '{0}'")]
    InvalidSeason(String),

    #[error("Unknown category: '{0}'")]
    UnknownCategory(String),

    #[error("Yearly series is not contiguous: expected year {expected}, found {found}")]
    NonContiguousSeries { expected: i32, found: i32 },
}
