use std::collections::HashSet;

use tracing::{debug, info};

use crate::collaborator::{GenerationRequest, GenerativeCollaborator};
use crate::error::{InsightError, Result};
use crate::models::{AttendanceRecord, InsightResult};
use crate::prompt;

/// Sends one insight request for a class and validates the reply.
///
/// The collaborator is called exactly once, even for an empty record set.
/// Nothing is retried and nothing partial is ever returned.
pub async fn request_attendance_insights(
    collaborator: &dyn GenerativeCollaborator,
    records: &[AttendanceRecord],
    class_descriptor: &str,
) -> Result<InsightResult> {
    if class_descriptor.trim().is_empty() {
        return Err(InsightError::InvalidRequest(
            "class descriptor must not be empty".to_string(),
        ));
    }

    let request = GenerationRequest {
        prompt: prompt::build_prompt(records, class_descriptor),
        response_schema: prompt::response_schema(),
    };

    info!(
        records = records.len(),
        class = class_descriptor,
        "requesting attendance insights"
    );

    let reply = collaborator.generate(&request).await.map_err(|err| {
        debug!(error = %err, "collaborator call failed");
        err
    })?;

    let result = parse_insight(&reply).and_then(|result| {
        check_students(&result, records)?;
        Ok(result)
    });

    match &result {
        Ok(r) => info!(
            truancy_candidates = r.potential_truancy.len(),
            "attendance insights received"
        ),
        Err(err) => debug!(error = %err, "insight reply rejected"),
    }

    result
}

pub fn parse_insight(reply: &str) -> Result<InsightResult> {
    serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| InsightError::Validation(format!("reply does not match schema: {}", e)))
}

fn check_students(result: &InsightResult, records: &[AttendanceRecord]) -> Result<()> {
    let known: HashSet<&str> = records.iter().map(|r| r.student_id.as_str()).collect();

    for candidate in &result.potential_truancy {
        if !known.contains(candidate.student_id.as_str()) {
            return Err(InsightError::Validation(format!(
                "truancy candidate {} is not in the attendance records",
                candidate.student_id
            )));
        }
    }

    Ok(())
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TruancyCandidate;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use std::sync::Mutex;

    struct CannedCollaborator {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedCollaborator {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeCollaborator for CannedCollaborator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.reply.clone().map_err(InsightError::Transport)
        }
    }

    // Ten school days for five students; S3 misses three of them.
    fn school_fortnight() -> Vec<AttendanceRecord> {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let mut records = Vec::new();
        for day in 0..10 {
            let date = start + Duration::days(day);
            for student in ["S1", "S2", "S3", "S4", "S5"] {
                records.push(AttendanceRecord {
                    student_id: student.to_string(),
                    date,
                    is_present: !(student == "S3" && matches!(day, 1 | 4 | 8)),
                });
            }
        }
        records
    }

    const CANNED: &str = r#"{
        "overallAttendanceTrend": "Attendance is high at 94%.",
        "potentialTruancy": [{ "studentId": "S3", "numberOfAbsences": 3 }],
        "suggestedInterventions": "Contact the family of S3."
    }"#;

    #[tokio::test]
    async fn canned_reply_round_trips_into_result() {
        let records = school_fortnight();
        let collaborator = CannedCollaborator::replying(CANNED);

        let result = request_attendance_insights(&collaborator, &records, "Grade 10 Biology")
            .await
            .unwrap();

        assert_eq!(
            result,
            InsightResult {
                overall_attendance_trend: "Attendance is high at 94%.".to_string(),
                potential_truancy: vec![TruancyCandidate {
                    student_id: "S3".to_string(),
                    number_of_absences: 3,
                }],
                suggested_interventions: "Contact the family of S3.".to_string(),
            }
        );

        let prompts = collaborator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].matches("- Student ").count(), records.len());
        assert_eq!(prompts[0].matches(": absent").count(), 3);
    }

    #[tokio::test]
    async fn empty_records_still_call_collaborator() {
        let collaborator = CannedCollaborator::replying(
            r#"{"overallAttendanceTrend":"No data.","potentialTruancy":[],"suggestedInterventions":"None."}"#,
        );

        let result = request_attendance_insights(&collaborator, &[], "Grade 7 Math")
            .await
            .unwrap();

        assert_eq!(collaborator.calls(), 1);
        assert!(result.potential_truancy.is_empty());
    }

    #[tokio::test]
    async fn string_absence_count_is_a_validation_error() {
        let collaborator = CannedCollaborator::replying(
            r#"{"overallAttendanceTrend":"ok","potentialTruancy":[{"studentId":"S3","numberOfAbsences":"3"}],"suggestedInterventions":"x"}"#,
        );

        let err = request_attendance_insights(&collaborator, &school_fortnight(), "Grade 10")
            .await
            .unwrap_err();

        assert!(matches!(err, InsightError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_student_is_a_validation_error() {
        let collaborator = CannedCollaborator::replying(
            r#"{"overallAttendanceTrend":"ok","potentialTruancy":[{"studentId":"S99","numberOfAbsences":2}],"suggestedInterventions":"x"}"#,
        );

        let err = request_attendance_insights(&collaborator, &school_fortnight(), "Grade 10")
            .await
            .unwrap_err();

        assert!(matches!(err, InsightError::Validation(msg) if msg.contains("S99")));
    }

    #[tokio::test]
    async fn transport_failure_is_propagated() {
        let collaborator = CannedCollaborator::failing("connection refused");

        let err = request_attendance_insights(&collaborator, &school_fortnight(), "Grade 10")
            .await
            .unwrap_err();

        assert!(matches!(err, InsightError::Transport(_)));
        assert!(err.is_generation_failure());
    }

    #[tokio::test]
    async fn blank_descriptor_is_rejected_before_calling() {
        let collaborator = CannedCollaborator::replying(CANNED);

        let err = request_attendance_insights(&collaborator, &school_fortnight(), "   ")
            .await
            .unwrap_err();

        assert!(matches!(err, InsightError::InvalidRequest(_)));
        assert!(!err.is_generation_failure());
        assert_eq!(collaborator.calls(), 0);
    }

    #[test]
    fn rejects_missing_fields_and_bad_counts() {
        assert!(parse_insight(r#"{"overallAttendanceTrend":"ok","potentialTruancy":[]}"#).is_err());
        assert!(parse_insight(
            r#"{"overallAttendanceTrend":"ok","potentialTruancy":[{"studentId":"S1","numberOfAbsences":-1}],"suggestedInterventions":"x"}"#
        )
        .is_err());
        assert!(parse_insight(
            r#"{"overallAttendanceTrend":"ok","potentialTruancy":[{"studentId":"S1","numberOfAbsences":2.5}],"suggestedInterventions":"x"}"#
        )
        .is_err());
        assert!(parse_insight("Attendance looks fine.").is_err());
    }

    #[test]
    fn tolerates_markdown_code_fence() {
        let fenced = format!("```json\n{}\n```", CANNED);
        let result = parse_insight(&fenced).unwrap();
        assert_eq!(result.potential_truancy[0].number_of_absences, 3);
    }
}
