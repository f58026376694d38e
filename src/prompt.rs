use std::fmt::Write;

use serde_json::{json, Value};

use crate::models::AttendanceRecord;

pub fn build_prompt(records: &[AttendanceRecord], class_descriptor: &str) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are an assistant to a school administrator. Analyze the attendance records \
         below for the class \"{}\".",
        class_descriptor.trim()
    );
    let _ = writeln!(
        prompt,
        "Describe the overall attendance trend, list students who may be at risk of \
         truancy with their number of absences, and suggest interventions."
    );
    let _ = writeln!(
        prompt,
        "Only list student IDs that appear in the records. If there are no records, \
         say so in the trend and return an empty truancy list."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Attendance records ({}):", records.len());

    if records.is_empty() {
        let _ = writeln!(prompt, "(none)");
    } else {
        for record in records {
            let _ = writeln!(
                prompt,
                "- Student {} on {}: {}",
                record.student_id,
                record.date,
                if record.is_present { "present" } else { "absent" }
            );
        }
    }

    let _ = writeln!(prompt);
    let _ = write!(prompt, "Respond with JSON matching the provided schema.");
    prompt
}

/// Response schema in the OpenAPI subset accepted by `generationConfig.responseSchema`.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallAttendanceTrend": {
                "type": "STRING",
                "description": "Summary of the overall attendance trend for the class."
            },
            "potentialTruancy": {
                "type": "ARRAY",
                "description": "Students who may be at risk of truancy.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "studentId": { "type": "STRING" },
                        "numberOfAbsences": { "type": "INTEGER", "minimum": 0 }
                    },
                    "required": ["studentId", "numberOfAbsences"],
                    "propertyOrdering": ["studentId", "numberOfAbsences"]
                }
            },
            "suggestedInterventions": {
                "type": "STRING",
                "description": "Interventions to improve attendance."
            }
        },
        "required": ["overallAttendanceTrend", "potentialTruancy", "suggestedInterventions"],
        "propertyOrdering": ["overallAttendanceTrend", "potentialTruancy", "suggestedInterventions"]
    })
}
