//! XLSX persistence for analysis reports.
//!
//! The workbook carries one sheet of optimization suggestions and one sheet
//! of flagged issues, with the review history appended as a trailing section
//! on the issues sheet so the report is a complete audit of the session.
//! Column sizing is cosmetic: a sizing failure must never fail the save.

use crate::session::SessionPaths;
use crate::state::{AnalysisReport, ReviewHistoryEntry};
use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::path::PathBuf;

const OPTIMIZATION_HEADERS: [&str; 4] =
    ["priority_level", "original_text", "suggested_text", "rationale"];
const ISSUE_HEADERS: [&str; 4] = ["issue", "priority_levels", "severity", "impact"];
const HISTORY_HEADERS: [&str; 3] = ["iteration", "feedback", "recorded_at"];

/// Write the analysis report workbook and return its path.
pub fn write_analysis_report(
    paths: &SessionPaths,
    analysis: &AnalysisReport,
    history: &[ReviewHistoryEntry],
) -> Result<PathBuf> {
    fs::create_dir_all(paths.reports_dir()).context("create analysis_reports dir")?;
    let path = paths.report_file_path();

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Optimizations")?;
    write_header_row(sheet, 0, &OPTIMIZATION_HEADERS, &bold)?;
    let mut rows: Vec<[String; 4]> = Vec::new();
    for entry in &analysis.optimizations {
        rows.push([
            entry.priority_level.to_string(),
            entry.original_text.clone(),
            entry.suggested_text.clone(),
            entry.rationale.clone(),
        ]);
    }
    write_rows(sheet, 1, &rows)?;
    autosize_columns(sheet, &OPTIMIZATION_HEADERS, &rows);

    let sheet = workbook.add_worksheet();
    sheet.set_name("Issues")?;
    write_header_row(sheet, 0, &ISSUE_HEADERS, &bold)?;
    let mut rows: Vec<[String; 4]> = Vec::new();
    for issue in &analysis.issues {
        let levels = issue
            .priority_levels
            .iter()
            .map(|level| level.label())
            .collect::<Vec<_>>()
            .join(", ");
        rows.push([
            issue.issue.clone(),
            levels,
            format!("{:?}", issue.severity),
            issue.impact.clone(),
        ]);
    }
    write_rows(sheet, 1, &rows)?;

    if let Some(error) = &analysis.error {
        let row = rows.len() as u32 + 2;
        sheet.write_with_format(row, 0, "analysis_error", &bold)?;
        sheet.write_string(row, 1, error.as_str())?;
    }

    // Review history trails the issues so the report carries the whole
    // feedback thread.
    if !history.is_empty() {
        let mut row = rows.len() as u32 + 2;
        if analysis.error.is_some() {
            row += 2;
        }
        sheet.write_with_format(row, 0, "Review History", &bold)?;
        row += 1;
        for (col, header) in HISTORY_HEADERS.iter().enumerate() {
            sheet.write_with_format(row, col as u16, *header, &bold)?;
        }
        for entry in history {
            row += 1;
            sheet.write_number(row, 0, f64::from(entry.iteration))?;
            sheet.write_string(row, 1, entry.feedback.as_str())?;
            sheet.write_string(row, 2, entry.recorded_at.as_str())?;
        }
    }
    autosize_columns(sheet, &ISSUE_HEADERS, &rows);

    workbook
        .save(&path)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

fn write_header_row(
    sheet: &mut Worksheet,
    row: u32,
    headers: &[&str],
    bold: &Format,
) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_with_format(row, col as u16, *header, bold)?;
    }
    Ok(())
}

fn write_rows(sheet: &mut Worksheet, first_row: u32, rows: &[[String; 4]]) -> Result<()> {
    for (offset, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            sheet.write_string(first_row + offset as u32, col as u16, value.as_str())?;
        }
    }
    Ok(())
}

/// Best-effort column sizing; failures are swallowed on purpose.
fn autosize_columns(sheet: &mut Worksheet, headers: &[&str], rows: &[[String; 4]]) {
    for (col, header) in headers.iter().enumerate() {
        let content_width = rows
            .iter()
            .map(|row| row.get(col).map(|value| value.len()).unwrap_or(0))
            .max()
            .unwrap_or(0)
            .max(header.len());
        let width = content_width.clamp(12, 60) as f64;
        let _ = sheet.set_column_width(col as u16, width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PriorityLevel;
    use crate::state::{Issue, IssueSeverity, OptimizationEntry};

    #[test]
    fn report_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SessionPaths::new(dir.path().to_path_buf());
        let analysis = AnalysisReport {
            issues: vec![Issue {
                issue: "High overlaps Medium".into(),
                priority_levels: vec![PriorityLevel::High, PriorityLevel::Medium],
                severity: IssueSeverity::Warning,
                impact: "ambiguous tier assignment".into(),
            }],
            optimizations: vec![OptimizationEntry {
                priority_level: PriorityLevel::High,
                original_text: "1. launches".into(),
                suggested_text: "1. competitor launches".into(),
                rationale: "disambiguate".into(),
            }],
            error: None,
        };
        let history = vec![ReviewHistoryEntry {
            iteration: 2,
            feedback: "tighten High".into(),
            recorded_at: "2026-02-01T10:00:00Z".into(),
        }];

        let path = write_analysis_report(&paths, &analysis, &history).unwrap();

        assert!(path.is_file());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));
        assert!(path.starts_with(paths.reports_dir()));
    }

    #[test]
    fn empty_report_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SessionPaths::new(dir.path().to_path_buf());
        let path =
            write_analysis_report(&paths, &AnalysisReport::default(), &[]).unwrap();
        assert!(path.is_file());
    }
}
