//! Day-to-day records: attendance, assessments and fees.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields::{Fields, Loose};
use super::{EntityKind, Mapping, Syncable, Unrecognized};

/// One student's attendance on one day (`attendance` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leave_application: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for AttendanceRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        let status = self.status.as_deref().map(normalize_attendance_status);
        Ok(Mapping::new(
            EntityKind::StudentAttendance,
            Fields::new()
                .opt("student", &self.student_id)
                .opt("student_name", &self.student_name)
                .opt("student_group", &self.student_group)
                .opt("date", &self.date)
                .opt("status", &status)
                .opt("leave_application", &self.leave_application)
                .build(),
        ))
    }
}

/// Maps free-form status text to the remote's `Present`/`Absent`/`Half Day`.
///
/// Unrecognised values pass through untouched and the remote validates them.
pub fn normalize_attendance_status(status: &str) -> String {
    let key: String = status
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    match key.as_str() {
        "present" | "p" => "Present".to_string(),
        "absent" | "a" => "Absent".to_string(),
        "halfday" => "Half Day".to_string(),
        _ => status.to_string(),
    }
}

/// A planned assessment (`assessments` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_group: Option<String>,
    /// Criteria list, passed through as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<Loose<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_scale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for AssessmentRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        Ok(Mapping::new(
            EntityKind::AssessmentPlan,
            Fields::new()
                .opt("assessment_name", &self.name)
                .opt("assessment_group", &self.group)
                .opt("program", &self.program)
                .opt("course", &self.course)
                .opt("student_group", &self.student_group)
                .opt("assessment_criteria", &self.criteria)
                .loose("maximum_score", &self.max_score)
                .opt("grading_scale", &self.grading_scale)
                .opt("schedule_date", &self.scheduled_date)
                .build(),
        ))
    }
}

/// A fee structure for a program and term (`fees` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_name: Option<String>,
    /// Fee component rows, passed through as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for FeeRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        Ok(Mapping::new(
            EntityKind::FeeStructure,
            Fields::new()
                .opt("program", &self.program)
                .opt("student_category", &self.student_category)
                .opt("academic_term", &self.academic_term)
                .opt("fee_structure_name", &self.structure_name)
                .opt("components", &self.components)
                .build(),
        ))
    }
}
