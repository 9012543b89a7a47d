//! Predefined casualty and trend queries.

use std::collections::HashMap;

use crate::engine::{AnalyticsEngine, share_pct};
use crate::error::{AnalyticsError, Result};
use crash_domain::{
    AnnualCasualties, CasualtyTotal, Category, SeasonalCasualties, Season, TrendLine,
    UNKNOWN_LABEL, YearlyCount,
};

impl AnalyticsEngine {
    /// Total fatalities per value of a category.
    ///
    /// Missing fatality counts add 0. Ordered by fatalities descending,
    /// equal sums in first-seen order.
    pub fn casualties_by_category(&self, category: Category) -> Result<Vec<CasualtyTotal>> {
        let sums = self.ranked_casualties(category, None)?;
        Ok(casualty_shares(sums))
    }

    /// The `n` deadliest values of a category, ascending by fatalities.
    pub fn casualties_top_n(&self, category: Category, n: usize) -> Result<Vec<CasualtyTotal>> {
        if n == 0 {
            return Err(AnalyticsError::InvalidParameter(
                "top-N size must be at least 1".to_string(),
            ));
        }
        let mut sums = self.ranked_casualties(category, Some(n))?;
        sums.reverse();
        Ok(casualty_shares(sums))
    }

    fn ranked_casualties(
        &self,
        category: Category,
        limit: Option<usize>,
    ) -> Result<Vec<(String, i64)>> {
        let column = category.column();
        let limit_clause = limit.map(|n| format!("LIMIT {n}")).unwrap_or_default();
        let query = format!(
            r"
            SELECT
                COALESCE({column}, '{UNKNOWN_LABEL}') AS label,
                CAST(SUM(COALESCE(total_fatalities, 0)) AS BIGINT) AS fatalities,
                MIN(row_id) AS first_seen
            FROM incidents
            GROUP BY label
            ORDER BY fatalities DESC, first_seen ASC
            {limit_clause}
            "
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }

    /// Fatalities per season for the `top_causes` most frequent causes.
    ///
    /// Causes come in frequency order and every cause gets one cell per
    /// season, 0 where nothing happened. An `Unknown` season cell is added
    /// only when some of those causes have undated rows.
    pub fn casualties_by_cause_and_season(
        &self,
        top_causes: usize,
    ) -> Result<Vec<SeasonalCasualties>> {
        let causes: Vec<String> = self
            .category_counts(Category::Cause)?
            .into_iter()
            .take(top_causes)
            .map(|c| c.label)
            .collect();

        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT
                COALESCE(crash_cause, '{UNKNOWN_LABEL}') AS cause_label,
                COALESCE(season, '{UNKNOWN_LABEL}') AS season_label,
                CAST(SUM(COALESCE(total_fatalities, 0)) AS BIGINT) AS fatalities
            FROM incidents
            GROUP BY cause_label, season_label
            "
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                (row.get::<_, String>(0)?, row.get::<_, String>(1)?),
                row.get::<_, i64>(2)?,
            ))
        })?;
        let cells: HashMap<(String, String), i64> =
            rows.collect::<std::result::Result<_, _>>()?;

        let has_unknown_season = causes
            .iter()
            .any(|cause| cells.contains_key(&(cause.clone(), UNKNOWN_LABEL.to_string())));
        let mut seasons: Vec<&str> = Season::ALL.iter().map(Season::as_str).collect();
        if has_unknown_season {
            seasons.push(UNKNOWN_LABEL);
        }

        let mut grid = Vec::with_capacity(causes.len() * seasons.len());
        for cause in &causes {
            for season in &seasons {
                let key = (cause.clone(), (*season).to_string());
                grid.push(SeasonalCasualties {
                    cause: cause.clone(),
                    season: (*season).to_string(),
                    fatalities: cells.get(&key).copied().unwrap_or(0),
                });
            }
        }
        Ok(grid)
    }

    /// Fatalities and people on board summed per dated year.
    pub fn annual_casualties(&self) -> Result<Vec<AnnualCasualties>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT
                year,
                CAST(SUM(COALESCE(total_fatalities, 0)) AS BIGINT) AS fatalities,
                CAST(SUM(COALESCE(total_on_board, 0)) AS BIGINT) AS on_board
            FROM incidents
            WHERE year IS NOT NULL
            GROUP BY year
            ORDER BY year
            ",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(AnnualCasualties {
                year: row.get(0)?,
                total_fatalities: row.get(1)?,
                total_on_board: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(AnalyticsError::from)
    }

    /// Least-squares trend through the yearly counts.
    pub fn trend_line(&self) -> Result<Option<TrendLine>> {
        Ok(fit_trend(&self.yearly_counts()?))
    }
}

fn casualty_shares(sums: Vec<(String, i64)>) -> Vec<CasualtyTotal> {
    let total: i64 = sums.iter().map(|(_, n)| n).sum();
    sums.into_iter()
        .map(|(label, fatalities)| CasualtyTotal {
            share_pct: share_pct(fatalities, total),
            label,
            fatalities,
        })
        .collect()
}

/// Ordinary least squares of count on year.
///
/// `None` with fewer than two points. A flat series has `r_value` 0.
#[allow(clippy::cast_precision_loss)]
pub fn fit_trend(points: &[YearlyCount]) -> Option<TrendLine> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| f64::from(p.year)).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.count as f64).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = f64::from(p.year) - mean_x;
        let dy = p.count as f64 - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let slope = sxy / sxx;
    let r_value = if syy > 0.0 { sxy / (sxx * syy).sqrt() } else { 0.0 };
    Some(TrendLine {
        slope,
        intercept: mean_y - slope * mean_x,
        r_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{record, sample_records};

    #[test]
    fn test_casualties_treat_missing_as_zero() {
        let engine = AnalyticsEngine::from_records(&sample_records()).unwrap();
        let casualties = engine.casualties_by_category(Category::Cause).unwrap();

        let pairs: Vec<(&str, i64)> = casualties
            .iter()
            .map(|c| (c.label.as_str(), c.fatalities))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Technical failure", 40),
                ("Human factor", 10),
                ("Weather", 8),
                ("Unknown", 2),
            ]
        );
        let total_share: f64 = casualties.iter().map(|c| c.share_pct).sum();
        assert!((total_share - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_casualties_top_n_ascending() {
        let engine = AnalyticsEngine::from_records(&sample_records()).unwrap();
        let top = engine.casualties_top_n(Category::Cause, 2).unwrap();
        assert_eq!(top[0].label, "Human factor");
        assert_eq!(top[1].label, "Technical failure");
        assert!((top[1].share_pct - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_cause_season_grid_fills_zeros() {
        let engine = AnalyticsEngine::from_records(&sample_records()).unwrap();
        let grid = engine.casualties_by_cause_and_season(2).unwrap();

        // Human factor (2 rows) then Weather (2 rows, seen later); Weather has an undated row
        let causes: Vec<&str> = grid.iter().map(|c| c.cause.as_str()).collect();
        assert_eq!(causes.len(), 10);
        assert_eq!(causes[0], "Human factor");
        assert_eq!(causes[5], "Weather");

        let cell = |cause: &str, season: &str| {
            grid.iter()
                .find(|c| c.cause == cause && c.season == season)
                .map(|c| c.fatalities)
        };
        assert_eq!(cell("Human factor", "Winter"), Some(10));
        assert_eq!(cell("Human factor", "Summer"), Some(0));
        assert_eq!(cell("Human factor", "Autumn"), Some(0));
        assert_eq!(cell("Weather", "Spring"), Some(3));
        assert_eq!(cell("Weather", "Unknown"), Some(5));
        assert_eq!(cell("Human factor", "Unknown"), Some(0));
    }

    #[test]
    fn test_annual_casualties() {
        let engine = AnalyticsEngine::from_records(&sample_records()).unwrap();
        let annual = engine.annual_casualties().unwrap();

        assert_eq!(annual.len(), 3);
        assert_eq!(
            annual[0],
            AnnualCasualties {
                year: 1990,
                total_fatalities: 13,
                total_on_board: 40
            }
        );
        assert_eq!(annual[1].total_fatalities, 40);
    }

    #[test]
    fn test_trend_line() {
        let points: Vec<YearlyCount> = (0..10)
            .map(|i| YearlyCount {
                year: 2000 + i,
                count: i64::from(3 + 2 * i),
            })
            .collect();
        let trend = fit_trend(&points).unwrap();
        assert!((trend.slope - 2.0).abs() < 1e-9);
        assert!((trend.at(2000) - 3.0).abs() < 1e-6);
        assert!((trend.r_value - 1.0).abs() < 1e-9);

        assert!(fit_trend(&points[..1]).is_none());
    }

    #[test]
    fn test_trend_line_from_engine() {
        let records = vec![
            record(Some((2000, 1, 1)), Some("Peru"), None, None),
            record(Some((2001, 1, 1)), Some("Peru"), None, None),
            record(Some((2001, 6, 1)), Some("Peru"), None, None),
        ];
        let engine = AnalyticsEngine::from_records(&records).unwrap();
        let trend = engine.trend_line().unwrap().unwrap();
        assert!((trend.slope - 1.0).abs() < 1e-9);
    }
}
