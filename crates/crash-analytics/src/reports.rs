//! Report generation for analytics data.

use std::fmt::Write as _;

use crate::engine::AnalyticsEngine;
use crate::error::{AnalyticsError, Result};
use crash_domain::{
    AnnualCasualties, CasualtyTotal, Category, CategoryCount, SeasonalCasualties, TrendLine,
    YearlyCount,
};
use serde::{Deserialize, Serialize};

/// Number of rows shown in the location, destination, operator and aircraft rankings.
pub const TOP_RANKING: usize = 10;

/// Number of causes shown in the cause rankings.
pub const TOP_CAUSES: usize = 5;

/// Every dashboard view computed in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub generated_at: String,
    pub total_incidents: i64,
    pub undated_incidents: i64,
    pub yearly_counts: Vec<YearlyCount>,
    pub trend: Option<TrendLine>,
    pub seasonal_distribution: Vec<CategoryCount>,
    pub country_counts: Vec<CategoryCount>,
    pub top_countries: Vec<CategoryCount>,
    pub top_destinations: Vec<CategoryCount>,
    pub top_causes: Vec<CategoryCount>,
    pub casualties_by_cause: Vec<CasualtyTotal>,
    pub top_operators: Vec<CategoryCount>,
    pub top_aircraft: Vec<CategoryCount>,
    pub annual_casualties: Vec<AnnualCasualties>,
    pub casualties_by_cause_and_season: Vec<SeasonalCasualties>,
}

impl AnalyticsEngine {
    /// Generate comprehensive analytics report.
    pub fn generate_report(&self) -> Result<AnalyticsReport> {
        Ok(AnalyticsReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_incidents: self.total_count()?,
            undated_incidents: self.undated_count()?,
            yearly_counts: self.yearly_counts()?,
            trend: self.trend_line()?,
            seasonal_distribution: self.seasonal_distribution()?,
            country_counts: self.category_counts(Category::Country)?,
            top_countries: self.category_top_n(Category::Country, TOP_RANKING)?,
            top_destinations: self.category_top_n(Category::Schedule, TOP_RANKING)?,
            top_causes: self.category_top_n(Category::Cause, TOP_CAUSES)?,
            casualties_by_cause: self.casualties_top_n(Category::Cause, TOP_CAUSES)?,
            top_operators: self.category_top_n(Category::Operator, TOP_RANKING)?,
            top_aircraft: self.category_top_n(Category::Aircraft, TOP_RANKING)?,
            annual_casualties: self.annual_casualties()?,
            casualties_by_cause_and_season: self.casualties_by_cause_and_season(TOP_CAUSES)?,
        })
    }

    /// Generate report as JSON string.
    pub fn generate_report_json(&self) -> Result<String> {
        let report = self.generate_report()?;
        serde_json::to_string_pretty(&report).map_err(|e| AnalyticsError::Conversion(e.to_string()))
    }

    /// Generate Markdown report.
    pub fn generate_report_markdown(&self) -> Result<String> {
        let report = self.generate_report()?;
        Ok(render_markdown(&report))
    }
}

fn ranking_section(md: &mut String, title: &str, column: &str, rows: &[CategoryCount]) {
    if rows.is_empty() {
        return;
    }
    let _ = writeln!(md, "## {title}\n");
    let _ = writeln!(md, "| {column} | Count | Share |");
    md.push_str("|------|-------|-------|\n");
    // ascending views read top-down as descending
    for row in rows.iter().rev() {
        let _ = writeln!(md, "| {} | {} | {:.2}% |", row.label, row.count, row.share_pct);
    }
    md.push('\n');
}

/// Render a report as Markdown tables.
pub fn render_markdown(report: &AnalyticsReport) -> String {
    let mut md = String::new();
    md.push_str("# Crash Records Analytics Report\n\n");
    let _ = writeln!(md, "**Generated:** {}\n", report.generated_at);

    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    let _ = writeln!(md, "| Total Incidents | {} |", report.total_incidents);
    let _ = writeln!(md, "| Undated Incidents | {} |", report.undated_incidents);
    if let Some(trend) = report.trend {
        let _ = writeln!(md, "| Trend (incidents/year) | {:+.3} |", trend.slope);
        let _ = writeln!(md, "| Trend r | {:.3} |", trend.r_value);
    }
    md.push('\n');

    if !report.yearly_counts.is_empty() {
        let total: i64 = report.yearly_counts.iter().map(|p| p.count).sum();
        md.push_str("## Incidents Per Year\n\n");
        md.push_str("| Year | Incidents | Share |\n");
        md.push_str("|------|-----------|-------|\n");
        for point in &report.yearly_counts {
            let _ = writeln!(
                md,
                "| {} | {} | {:.2}% |",
                point.year,
                point.count,
                crate::engine::share_pct(point.count, total)
            );
        }
        md.push('\n');
    }

    if !report.seasonal_distribution.is_empty() {
        md.push_str("## Seasonal Distribution\n\n");
        md.push_str("| Season | Count | Share |\n");
        md.push_str("|--------|-------|-------|\n");
        for row in &report.seasonal_distribution {
            let _ = writeln!(md, "| {} | {} | {:.1}% |", row.label, row.count, row.share_pct);
        }
        md.push('\n');
    }

    ranking_section(&mut md, "Top Crash Locations", "Country", &report.top_countries);
    ranking_section(&mut md, "Top Destinations", "Schedule", &report.top_destinations);
    ranking_section(&mut md, "Top Crash Causes", "Cause", &report.top_causes);

    if !report.casualties_by_cause.is_empty() {
        md.push_str("## Casualties by Crash Cause\n\n");
        md.push_str("| Cause | Fatalities | Share |\n");
        md.push_str("|-------|------------|-------|\n");
        for row in report.casualties_by_cause.iter().rev() {
            let _ = writeln!(md, "| {} | {} | {:.2}% |", row.label, row.fatalities, row.share_pct);
        }
        md.push('\n');
    }

    ranking_section(&mut md, "Top Operators", "Operator", &report.top_operators);
    ranking_section(&mut md, "Top Aircraft", "Aircraft", &report.top_aircraft);

    if !report.annual_casualties.is_empty() {
        md.push_str("## Annual Fatalities\n\n");
        md.push_str("| Year | Fatalities | On Board |\n");
        md.push_str("|------|------------|----------|\n");
        for row in &report.annual_casualties {
            let _ = writeln!(md, "| {} | {} | {} |", row.year, row.total_fatalities, row.total_on_board);
        }
        md.push('\n');
    }

    if !report.casualties_by_cause_and_season.is_empty() {
        md.push_str("## Casualties by Top Causes Across Seasons\n\n");
        md.push_str("| Cause | Season | Fatalities |\n");
        md.push_str("|-------|--------|------------|\n");
        for cell in &report.casualties_by_cause_and_season {
            let _ = writeln!(md, "| {} | {} | {} |", cell.cause, cell.season, cell.fatalities);
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::sample_records;

    #[test]
    fn test_empty_report() {
        let engine = AnalyticsEngine::new_in_memory().unwrap();
        let report = engine.generate_report().unwrap();
        assert_eq!(report.total_incidents, 0);
        assert!(report.yearly_counts.is_empty());
        assert!(report.trend.is_none());
        assert!(report.top_countries.is_empty());
    }

    #[test]
    fn test_report_views() {
        let engine = AnalyticsEngine::from_records(&sample_records()).unwrap();
        let report = engine.generate_report().unwrap();

        assert_eq!(report.total_incidents, 6);
        assert_eq!(report.undated_incidents, 1);
        assert_eq!(report.top_countries.len(), 4);
        assert_eq!(report.top_causes.last().map(|c| c.label.as_str()), Some("Human factor"));

        let json = engine.generate_report_json().unwrap();
        let parsed: AnalyticsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.yearly_counts, report.yearly_counts);
    }

    #[test]
    fn test_markdown_generation() {
        let engine = AnalyticsEngine::from_records(&sample_records()).unwrap();
        let md = engine.generate_report_markdown().unwrap();
        assert!(md.contains("# Crash Records Analytics Report"));
        assert!(md.contains("## Seasonal Distribution"));
        assert!(md.contains("| Russia | 2 | 33.33% |"));
    }
}
