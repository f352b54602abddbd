//! Service attendance states, summaries and absence alerts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use chrono::NaiveTime;

use crate::types::{Date, Timestamp};

/// Default threshold of excused + missing entries that raises an alert.
pub const DEFAULT_ALERT_THRESHOLD: i64 = 3;
/// Default number of most recent entries inspected for the alert.
pub const DEFAULT_ALERT_LAST_ENTRIES: i64 = 10;
/// Default length of the "top members" lists.
pub const DEFAULT_TOP_LIMIT: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceState {
    /// Present.
    #[serde(rename = "A")]
    Present,
    /// Excused.
    #[serde(rename = "E")]
    Excused,
    /// Missing (unexcused).
    #[serde(rename = "F")]
    Missing,
}

impl AttendanceState {
    pub fn code(self) -> &'static str {
        match self {
            AttendanceState::Present => "A",
            AttendanceState::Excused => "E",
            AttendanceState::Missing => "F",
        }
    }
}

impl fmt::Display for AttendanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AttendanceState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AttendanceState::Present),
            "E" => Ok(AttendanceState::Excused),
            "F" => Ok(AttendanceState::Missing),
            other => Err(CoreError::Validation(format!(
                "Invalid attendance state '{other}'. Must be one of A, E, F"
            ))),
        }
    }
}

/// Counts per attendance state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    #[serde(rename = "A")]
    pub present: i64,
    #[serde(rename = "E")]
    pub excused: i64,
    #[serde(rename = "F")]
    pub missing: i64,
}

impl StateCounts {
    pub fn add(&mut self, state: AttendanceState, n: i64) {
        match state {
            AttendanceState::Present => self.present += n,
            AttendanceState::Excused => self.excused += n,
            AttendanceState::Missing => self.missing += n,
        }
    }

    pub fn absences(&self) -> i64 {
        self.excused + self.missing
    }

    pub fn total(&self) -> i64 {
        self.present + self.absences()
    }
}

impl FromIterator<AttendanceState> for StateCounts {
    fn from_iter<I: IntoIterator<Item = AttendanceState>>(iter: I) -> Self {
        let mut counts = StateCounts::default();
        for state in iter {
            counts.add(state, 1);
        }
        counts
    }
}

/// Result of the absence alert check for one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceAlert {
    pub alert: bool,
    pub absences: i64,
    pub inspected: i64,
    pub threshold: i64,
}

/// Check the most recent entries (newest first, already limited to the
/// configured window) against the absence threshold.
pub fn check_alert(recent: &[AttendanceState], threshold: i64) -> AttendanceAlert {
    let counts: StateCounts = recent.iter().copied().collect();
    AttendanceAlert {
        alert: counts.absences() >= threshold,
        absences: counts.absences(),
        inspected: counts.total(),
        threshold,
    }
}

/// Chart series of attendance, one point per service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSeries {
    pub labels: Vec<String>,
    pub dates: Vec<String>,
    #[serde(rename = "A")]
    pub present: Vec<i64>,
    #[serde(rename = "E")]
    pub excused: Vec<i64>,
    #[serde(rename = "F")]
    pub missing: Vec<i64>,
}

/// Build the series from per-service rows keyed by service start, ordering
/// them chronologically. Services on the same day stay separate points.
pub fn attendance_series(mut rows: Vec<(Timestamp, StateCounts)>) -> AttendanceSeries {
    rows.sort_by_key(|(start, _)| *start);
    let mut series = AttendanceSeries::default();
    for (start, counts) in rows {
        series.labels.push(start.format("%d.%m.%Y").to_string());
        series.dates.push(start.format("%Y-%m-%d").to_string());
        series.present.push(counts.present);
        series.excused.push(counts.excused);
        series.missing.push(counts.missing);
    }
    series
}

/// A service must not end before it starts.
pub fn validate_service_times(start: Timestamp, end: Timestamp) -> Result<(), CoreError> {
    if end < start {
        return Err(CoreError::Validation(
            "Service end must not be before its start".into(),
        ));
    }
    Ok(())
}

/// Default start and end of a service held on `date`. An end time before the
/// start time is taken to fall on the following day.
pub fn service_window(date: Date, start: NaiveTime, end: NaiveTime) -> (Timestamp, Timestamp) {
    let start_at = date.and_time(start).and_utc();
    let mut end_at = date.and_time(end).and_utc();
    if end_at < start_at {
        end_at += chrono::Duration::days(1);
    }
    (start_at, end_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttendanceState::*;

    #[test]
    fn state_codes_round_trip_through_strings() {
        for state in [Present, Excused, Missing] {
            assert_eq!(state.code().parse::<AttendanceState>().unwrap(), state);
        }
        assert!("X".parse::<AttendanceState>().is_err());
    }

    #[test]
    fn counts_from_states() {
        let counts: StateCounts = [Present, Missing, Excused, Missing].into_iter().collect();
        assert_eq!(counts.present, 1);
        assert_eq!(counts.missing, 2);
        assert_eq!(counts.absences(), 3);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn alert_triggers_at_threshold() {
        let recent = [Missing, Excused, Present, Missing, Present];
        assert!(check_alert(&recent, 3).alert);
        assert!(!check_alert(&recent, 4).alert);
    }

    #[test]
    fn no_entries_no_alert() {
        let alert = check_alert(&[], 3);
        assert!(!alert.alert);
        assert_eq!(alert.inspected, 0);
    }

    #[test]
    fn alert_compares_absences_against_threshold_only() {
        assert!(check_alert(&[], 0).alert);
        assert!(check_alert(&[Present, Present], 0).alert);
        assert!(!check_alert(&[Missing], 2).alert);
    }

    #[test]
    fn series_is_chronological_with_german_labels() {
        let d1 = Date::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(18, 0, 0).unwrap().and_utc();
        let d2 = Date::from_ymd_opt(2024, 2, 20).unwrap().and_hms_opt(18, 0, 0).unwrap().and_utc();
        let series = attendance_series(vec![
            (d1, StateCounts { present: 5, excused: 1, missing: 0 }),
            (d2, StateCounts { present: 3, excused: 0, missing: 2 }),
        ]);
        assert_eq!(series.labels, vec!["20.02.2024", "05.03.2024"]);
        assert_eq!(series.dates, vec!["2024-02-20", "2024-03-05"]);
        assert_eq!(series.present, vec![3, 5]);
        assert_eq!(series.missing, vec![2, 0]);
    }

    #[test]
    fn same_day_services_stay_separate_points() {
        let day = Date::from_ymd_opt(2025, 5, 17).unwrap();
        let morning = day.and_hms_opt(9, 0, 0).unwrap().and_utc();
        let evening = day.and_hms_opt(18, 0, 0).unwrap().and_utc();
        let series = attendance_series(vec![
            (evening, StateCounts::default()),
            (morning, StateCounts { present: 1, excused: 0, missing: 1 }),
        ]);
        assert_eq!(series.dates, vec!["2025-05-17", "2025-05-17"]);
        assert_eq!(series.present, vec![1, 0]);
        assert_eq!(series.missing, vec![1, 0]);
    }

    #[test]
    fn service_end_before_start_is_rejected() {
        let (start, end) = service_window(
            Date::from_ymd_opt(2024, 5, 3).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
        );
        assert!(validate_service_times(start, end).is_ok());
        assert!(validate_service_times(start, start).is_ok());
        assert!(validate_service_times(end, start).is_err());
    }

    #[test]
    fn window_past_midnight_ends_next_day() {
        let date = Date::from_ymd_opt(2024, 5, 3).unwrap();
        let (start, end) = service_window(
            date,
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(1, 0, 0).unwrap(),
        );
        assert_eq!(start.date_naive(), date);
        assert_eq!(end.date_naive(), date.succ_opt().unwrap());
        assert_eq!((end - start).num_hours(), 3);
    }
}
