use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub date: NaiveDate,
    pub is_present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruancyCandidate {
    pub student_id: String,
    pub number_of_absences: u32,
}

/// Structured reply of the generative collaborator for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightResult {
    pub overall_attendance_trend: String,
    pub potential_truancy: Vec<TruancyCandidate>,
    pub suggested_interventions: String,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentAttendance {
    pub student_id: String,
    pub school_days: usize,
    pub absences: usize,
    pub attendance_rate: f64,
}
