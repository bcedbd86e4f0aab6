//! Calendar projection of scheduled projects.
//!
//! All instants are Unix epoch milliseconds.

use crate::model::project::{Project, ProjectId, ProjectStatus};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEvent {
    pub project_id: ProjectId,
    pub title: String,
    pub status: ProjectStatus,
    pub start: i64,
    pub end: i64,
    /// `end` was filled from the default span.
    pub open_ended: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalendarSummary {
    pub scheduled: usize,
    /// Start is at or before `now`.
    pub started: usize,
    /// Start is after `now`.
    pub upcoming: usize,
    /// An explicit end date lies before `now`.
    pub ended: usize,
}

/// Events for live projects with a start date, sorted by start then title.
pub fn calendar_events(projects: &[Project], default_span_ms: i64) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = projects
        .iter()
        .filter(|project| project.is_active())
        .filter_map(|project| {
            let start = project.start_date?;
            Some(CalendarEvent {
                project_id: project.id,
                title: project.name.clone(),
                status: project.status,
                start,
                end: project
                    .end_date
                    .unwrap_or_else(|| start.saturating_add(default_span_ms)),
                open_ended: project.end_date.is_none(),
            })
        })
        .collect();
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));
    events
}

pub fn calendar_summary(events: &[CalendarEvent], now: i64) -> CalendarSummary {
    events
        .iter()
        .fold(CalendarSummary::default(), |mut summary, event| {
            summary.scheduled += 1;
            if event.start <= now {
                summary.started += 1;
            } else {
                summary.upcoming += 1;
            }
            if !event.open_ended && event.end < now {
                summary.ended += 1;
            }
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::{calendar_events, calendar_summary};
    use crate::model::project::{Project, ProjectCategory};

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn scheduled(name: &str, start: Option<i64>, end: Option<i64>) -> Project {
        let mut project = Project::new(name, vec![ProjectCategory::Web]);
        project.start_date = start;
        project.end_date = end;
        project
    }

    #[test]
    fn missing_end_defaults_to_span_and_unscheduled_are_skipped() {
        let projects = vec![
            scheduled("Later", Some(10 * DAY_MS), None),
            scheduled("Unscheduled", None, None),
            scheduled("Sooner", Some(DAY_MS), Some(3 * DAY_MS)),
        ];

        let events = calendar_events(&projects, 7 * DAY_MS);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Sooner");
        assert_eq!(events[0].end, 3 * DAY_MS);
        assert!(!events[0].open_ended);
        assert_eq!(events[1].end, 17 * DAY_MS);
        assert!(events[1].open_ended);
    }

    #[test]
    fn summary_splits_started_upcoming_and_ended() {
        let projects = vec![
            scheduled("Past", Some(DAY_MS), Some(2 * DAY_MS)),
            scheduled("Running", Some(4 * DAY_MS), None),
            scheduled("Future", Some(9 * DAY_MS), Some(12 * DAY_MS)),
        ];
        let events = calendar_events(&projects, 7 * DAY_MS);

        let summary = calendar_summary(&events, 5 * DAY_MS);
        assert_eq!(summary.scheduled, 3);
        assert_eq!(summary.started, 2);
        assert_eq!(summary.upcoming, 1);
        assert_eq!(summary.ended, 1);
    }
}
