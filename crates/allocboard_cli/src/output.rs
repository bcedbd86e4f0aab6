//! Text/JSON rendering helpers and date conversion.

use allocboard_core::{AllocationRecord, Developer, Project};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}

/// Parses `YYYY-MM-DD` (UTC midnight) or raw epoch milliseconds.
pub fn parse_date(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    if let Ok(millis) = trimmed.parse::<i64>() {
        return Ok(millis);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp_millis())
        .ok_or_else(|| format!("invalid date `{trimmed}`; expected YYYY-MM-DD"))
}

pub fn format_date(millis: Option<i64>) -> String {
    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|datetime| datetime.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn developer_line(developer: &Developer) -> String {
    format!(
        "{}  {:<24} {:<32} {:>3}h  {:<9} skills={}",
        developer.id,
        developer.name,
        developer.email,
        developer.effective_capacity_hours(),
        if developer.is_available {
            "available"
        } else {
            "busy"
        },
        developer.skills.join(",")
    )
}

pub fn project_line(project: &Project) -> String {
    let categories: Vec<&str> = project
        .categories
        .iter()
        .map(|category| category.as_str())
        .collect();
    format!(
        "{}  {:<28} {:<28} {:<7} {} .. {}  categories={}",
        project.id,
        project.name,
        project.status.as_str(),
        project.priority.as_str(),
        format_date(project.start_date),
        format_date(project.end_date),
        categories.join(",")
    )
}

pub fn allocation_line(record: &AllocationRecord) -> String {
    let allocation = &record.allocation;
    format!(
        "{}  {:<24} {:<28} {:>3}h {:>5.1}%  worked={}h{}",
        allocation.id,
        record.developer_name.as_deref().unwrap_or("(removed developer)"),
        record.project_name.as_deref().unwrap_or("(removed project)"),
        allocation.hours_allocated,
        allocation.allocation_percentage,
        allocation.hours_worked,
        if record.orphaned { "  [orphaned]" } else { "" }
    )
}
