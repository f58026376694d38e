use std::fmt::Write;

use chrono::NaiveDate;

use crate::attendance;
use crate::models::{AttendanceRecord, ClassInfo, InsightResult};

pub fn render_insight(result: &InsightResult) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Trend: {}", result.overall_attendance_trend);
    if result.potential_truancy.is_empty() {
        let _ = writeln!(output, "Potential truancy: none");
    } else {
        let _ = writeln!(output, "Potential truancy:");
        for candidate in &result.potential_truancy {
            let _ = writeln!(
                output,
                "- {} ({} absences)",
                candidate.student_id, candidate.number_of_absences
            );
        }
    }
    let _ = writeln!(output, "Suggested interventions: {}", result.suggested_interventions);

    output
}

pub fn build_report(
    class: &ClassInfo,
    cutoff: NaiveDate,
    records: &[AttendanceRecord],
    insight: &InsightResult,
) -> String {
    let summaries = attendance::summarize_students(records);
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Insight Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}), records since {}",
        class.name, class.descriptor, cutoff
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance Summary");

    if summaries.is_empty() {
        let _ = writeln!(output, "No attendance recorded for this window.");
    } else {
        let _ = writeln!(
            output,
            "Class attendance rate: {:.1}% across {} marks",
            attendance::attendance_rate(records),
            records.len()
        );
        let _ = writeln!(output);
        for summary in &summaries {
            let _ = writeln!(
                output,
                "- {}: {} absences in {} school days ({:.1}% present)",
                summary.student_id, summary.absences, summary.school_days, summary.attendance_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall Trend");
    let _ = writeln!(output, "{}", insight.overall_attendance_trend);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Potential Truancy");
    if insight.potential_truancy.is_empty() {
        let _ = writeln!(output, "No students flagged.");
    } else {
        for candidate in &insight.potential_truancy {
            let _ = writeln!(
                output,
                "- {}: {} absences",
                candidate.student_id, candidate.number_of_absences
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Suggested Interventions");
    let _ = writeln!(output, "{}", insight.suggested_interventions);

    output
}
