use std::collections::HashMap;

use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};

use crate::models::{AttendanceRecord, StudentAttendance};

pub fn summarize_students(records: &[AttendanceRecord]) -> Vec<StudentAttendance> {
    let mut tallies: HashMap<&str, (usize, usize)> = HashMap::new();

    for record in records {
        let entry = tallies.entry(record.student_id.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if !record.is_present {
            entry.1 += 1;
        }
    }

    let mut values: Vec<StudentAttendance> = tallies
        .into_iter()
        .map(|(student_id, (school_days, absences))| StudentAttendance {
            student_id: student_id.to_string(),
            school_days,
            absences,
            attendance_rate: percentage(school_days - absences, school_days),
        })
        .collect();

    values.sort_by(|a, b| {
        b.absences
            .cmp(&a.absences)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    values
}

/// Share of present marks across all records, as a percentage.
pub fn attendance_rate(records: &[AttendanceRecord]) -> f64 {
    let present = records.iter().filter(|r| r.is_present).count();
    percentage(present, records.len())
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

pub fn cutoff_date(since_days: i64) -> anyhow::Result<NaiveDate> {
    Duration::try_days(since_days.max(1))
        .and_then(|window| Utc::now().date_naive().checked_sub_signed(window))
        .context("--since-days is out of range")
}
