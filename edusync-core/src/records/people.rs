//! Users, students, instructors and guardians.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields::{full_name, non_empty, Fields, Loose};
use super::{EntityKind, Mapping, Syncable, Unrecognized, DEFAULT_DEPARTMENT};

/// Role of a portal user, which decides the remote doctype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRole {
    Student,
    Instructor,
    Guardian,
    Unknown(String),
}

impl UserRole {
    pub fn parse(role: &str) -> Self {
        match role.trim().to_lowercase().as_str() {
            "student" => UserRole::Student,
            "instructor" | "teacher" => UserRole::Instructor,
            "parent" | "guardian" => UserRole::Guardian,
            _ => UserRole::Unknown(role.to_string()),
        }
    }
}

/// A portal user account (`users` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Loose<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_phone: Option<Loose<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<Loose<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn user_role(&self) -> UserRole {
        UserRole::parse(self.role.as_deref().unwrap_or_default())
    }

    fn display_name(&self) -> Option<String> {
        full_name(&[&self.first_name, &self.last_name])
    }
}

impl Syncable for UserRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        match self.user_role() {
            UserRole::Student => Ok(Mapping::new(
                EntityKind::Student,
                Fields::new()
                    .opt("first_name", &self.first_name)
                    .text_or("middle_name", &self.middle_name, "")
                    .opt("last_name", &self.last_name)
                    .opt("student_email_id", &self.email)
                    .loose("student_mobile_number", &self.phone)
                    .text_or("gender", &self.gender, "Male")
                    .opt("date_of_birth", &self.date_of_birth)
                    .opt("blood_group", &self.blood_group)
                    .opt("address_line_1", &self.address)
                    .text_or("city", &self.city, "Unknown")
                    .text_or("state", &self.state, "Unknown")
                    .loose("pincode", &self.pincode)
                    .flag("enabled", self.is_active)
                    .build(),
            )),
            UserRole::Instructor => Ok(Mapping::new(
                EntityKind::Instructor,
                Fields::new()
                    .opt("instructor_name", &self.display_name())
                    .text_or("gender", &self.gender, "Male")
                    .opt("employee", &self.employee_id)
                    .text_or("department", &self.department, DEFAULT_DEPARTMENT)
                    .put("status", active_status(self.is_active))
                    .build(),
            )),
            UserRole::Guardian => Ok(Mapping::new(
                EntityKind::Guardian,
                Fields::new()
                    .opt("guardian_name", &self.display_name())
                    .opt("email", &self.email)
                    .loose("mobile_number", &self.phone)
                    .loose("alternate_number", &self.alternate_phone)
                    .opt("date_of_birth", &self.date_of_birth)
                    .opt("occupation", &self.occupation)
                    .opt("designation", &self.designation)
                    .opt("work_address", &self.work_address)
                    .build(),
            )),
            UserRole::Unknown(role) => Err(Unrecognized::Role(role)),
        }
    }
}

/// A student admission record (`students` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Loose<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for StudentRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        Ok(Mapping::new(
            EntityKind::Student,
            Fields::new()
                .opt("first_name", &self.first_name)
                .text_or("middle_name", &self.middle_name, "")
                .opt("last_name", &self.last_name)
                .opt("student_email_id", &self.email)
                .loose("student_mobile_number", &self.phone)
                .opt("gender", &self.gender)
                .opt("date_of_birth", &self.date_of_birth)
                .opt("blood_group", &self.blood_group)
                .opt("student_category", &self.category)
                .opt("student_batch_name", &self.batch)
                .opt("program", &self.program)
                .flag("enabled", self.is_active)
                .build(),
        ))
    }
}

/// A teaching staff member (`instructors` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for InstructorRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        Ok(Mapping::new(
            EntityKind::Instructor,
            Fields::new()
                .opt("instructor_name", &self.name)
                .opt("gender", &self.gender)
                .opt("employee", &self.employee_id)
                .text_or("department", &self.department, DEFAULT_DEPARTMENT)
                .opt("custom_course", &self.course)
                .put("status", active_status(self.is_active))
                .build(),
        ))
    }
}

/// A parent or guardian (`guardians` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Loose<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_phone: Option<Loose<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for GuardianRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        let guardian_name = non_empty(&self.name)
            .map(str::to_string)
            .or_else(|| full_name(&[&self.first_name, &self.last_name]))
            .ok_or(Unrecognized::MissingKey("name"))?;

        Ok(Mapping::new(
            EntityKind::Guardian,
            Fields::new()
                .put("guardian_name", guardian_name)
                .opt("email", &self.email)
                .loose("mobile_number", &self.phone)
                .loose("alternate_number", &self.alternate_phone)
                .opt("date_of_birth", &self.date_of_birth)
                .opt("occupation", &self.occupation)
                .opt("designation", &self.designation)
                .opt("work_address", &self.work_address)
                .build(),
        ))
    }
}

fn active_status(is_active: Option<bool>) -> &'static str {
    if is_active.unwrap_or(false) {
        "Active"
    } else {
        "Inactive"
    }
}
