//! Local record types and their mappings to remote documents.
//!
//! Every snapshot collection has a typed record. Each record knows which
//! [`EntityKind`] it becomes remotely and how its fields translate; the
//! generic [`Synchronizer`](crate::sync::Synchronizer) does the rest.
//!
//! Records keep any JSON fields they don't model in `extra`, so a load/save
//! cycle never drops data written by other producers.

mod academics;
mod fields;
mod operations;
mod people;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use academics::{AcademicTermRecord, AcademicYearRecord, CourseRecord, ProgramRecord, RoomRecord};
pub use fields::Loose;
pub use operations::{normalize_attendance_status, AssessmentRecord, AttendanceRecord, FeeRecord};
pub use people::{GuardianRecord, InstructorRecord, StudentRecord, UserRecord, UserRole};

/// Department used when a course or instructor names none.
pub const DEFAULT_DEPARTMENT: &str = "CBSE - SRS";

/// Kinds of remote documents this engine writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Student,
    Instructor,
    Guardian,
    Program,
    Course,
    AcademicYear,
    AcademicTerm,
    Room,
    StudentAttendance,
    AssessmentPlan,
    FeeStructure,
}

impl EntityKind {
    pub const ALL: [EntityKind; 11] = [
        EntityKind::Student,
        EntityKind::Instructor,
        EntityKind::Guardian,
        EntityKind::Program,
        EntityKind::Course,
        EntityKind::AcademicYear,
        EntityKind::AcademicTerm,
        EntityKind::Room,
        EntityKind::StudentAttendance,
        EntityKind::AssessmentPlan,
        EntityKind::FeeStructure,
    ];

    /// Remote doctype name.
    pub fn doctype(&self) -> &'static str {
        match self {
            EntityKind::Student => "Student",
            EntityKind::Instructor => "Instructor",
            EntityKind::Guardian => "Guardian",
            EntityKind::Program => "Program",
            EntityKind::Course => "Course",
            EntityKind::AcademicYear => "Academic Year",
            EntityKind::AcademicTerm => "Academic Term",
            EntityKind::Room => "Room",
            EntityKind::StudentAttendance => "Student Attendance",
            EntityKind::AssessmentPlan => "Assessment Plan",
            EntityKind::FeeStructure => "Fee Structure",
        }
    }

    /// Prefix for minted identifiers, or `None` when the record's own name
    /// is the identifier.
    pub fn id_prefix(&self) -> Option<&'static str> {
        match self {
            EntityKind::Student => Some("EDU-STU"),
            EntityKind::Instructor => Some("EDU-INS"),
            EntityKind::Guardian => Some("EDU-GRD"),
            EntityKind::Program => Some("EDU-PRG"),
            EntityKind::Course => Some("EDU-CRS"),
            EntityKind::StudentAttendance => Some("EDU-ATT"),
            EntityKind::AssessmentPlan => Some("EDU-ASS-PLAN"),
            EntityKind::FeeStructure => Some("EDU-FEE-STRUCT"),
            EntityKind::AcademicYear | EntityKind::AcademicTerm | EntityKind::Room => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.doctype())
    }
}

/// Why a record was not mapped. These become skips, never failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unrecognized {
    #[error("unknown role '{0}'")]
    Role(String),
    #[error("missing {0}")]
    MissingKey(&'static str),
}

/// The remote shape of one record, before an identifier is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub kind: EntityKind,
    /// Identifier for kinds keyed by their own name
    pub natural_key: Option<String>,
    pub fields: Map<String, Value>,
}

impl Mapping {
    pub fn new(kind: EntityKind, fields: Map<String, Value>) -> Self {
        Self {
            kind,
            natural_key: None,
            fields,
        }
    }

    pub fn keyed(kind: EntityKind, key: String, fields: Map<String, Value>) -> Self {
        Self {
            kind,
            natural_key: Some(key),
            fields,
        }
    }
}

/// A document ready to send: doctype, identifier and flat fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    kind: EntityKind,
    name: String,
    fields: Map<String, Value>,
}

impl RemoteDocument {
    pub fn new(kind: EntityKind, name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            kind,
            name: name.into(),
            fields,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn doctype(&self) -> &'static str {
        self.kind.doctype()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Request body: the fields plus `name`.
    pub fn to_body(&self) -> Value {
        let mut body = self.fields.clone();
        body.insert("name".to_string(), Value::String(self.name.clone()));
        Value::Object(body)
    }
}

/// Local and remote identifiers carried by every record.
pub trait RecordIds {
    fn local_id(&self) -> Option<&str>;
    fn set_local_id(&mut self, id: String);
    /// Remote identifier; empty strings count as absent.
    fn remote_id(&self) -> Option<&str>;
    fn set_remote_id(&mut self, id: String);
}

/// A record that can be pushed to the remote API.
pub trait Syncable: RecordIds + Serialize + DeserializeOwned {
    /// Maps local fields to the remote schema.
    fn mapping(&self) -> Result<Mapping, Unrecognized>;
}

macro_rules! impl_record_ids {
    ($($ty:ty),* $(,)?) => {$(
        impl RecordIds for $ty {
            fn local_id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            fn set_local_id(&mut self, id: String) {
                self.id = Some(id);
            }

            fn remote_id(&self) -> Option<&str> {
                self.remote_id.as_deref().filter(|id| !id.is_empty())
            }

            fn set_remote_id(&mut self, id: String) {
                self.remote_id = Some(id);
            }
        }
    )*};
}

impl_record_ids!(
    UserRecord,
    StudentRecord,
    InstructorRecord,
    GuardianRecord,
    ProgramRecord,
    CourseRecord,
    AcademicYearRecord,
    AcademicTermRecord,
    RoomRecord,
    AttendanceRecord,
    AssessmentRecord,
    FeeRecord,
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minted_and_natural_kinds() {
        let natural: Vec<_> = EntityKind::ALL
            .iter()
            .filter(|k| k.id_prefix().is_none())
            .collect();
        assert_eq!(
            natural,
            vec![
                &EntityKind::AcademicYear,
                &EntityKind::AcademicTerm,
                &EntityKind::Room
            ]
        );
        assert_eq!(EntityKind::AssessmentPlan.id_prefix(), Some("EDU-ASS-PLAN"));
    }

    #[test]
    fn test_entity_kind_display_is_doctype() {
        assert_eq!(EntityKind::StudentAttendance.to_string(), "Student Attendance");
    }

    #[test]
    fn test_remote_document_body_includes_name() {
        let mut fields = Map::new();
        fields.insert("program_name".to_string(), json!("Science"));
        let doc = RemoteDocument::new(EntityKind::Program, "EDU-PRG-2025-00001", fields);

        assert_eq!(doc.doctype(), "Program");
        assert_eq!(
            doc.to_body(),
            json!({"name": "EDU-PRG-2025-00001", "program_name": "Science"})
        );
    }

    #[test]
    fn test_empty_remote_id_is_absent() {
        let mut record: ProgramRecord = serde_json::from_value(json!({"remoteId": ""})).unwrap();
        assert_eq!(record.remote_id(), None);

        record.set_remote_id("EDU-PRG-2025-00003".to_string());
        assert_eq!(record.remote_id(), Some("EDU-PRG-2025-00003"));
    }

    #[test]
    fn test_legacy_remote_id_key_is_accepted() {
        let record: CourseRecord =
            serde_json::from_value(json!({"erpnextId": "EDU-CRS-2024-00009"})).unwrap();
        assert_eq!(record.remote_id(), Some("EDU-CRS-2024-00009"));

        let saved = serde_json::to_value(&record).unwrap();
        assert_eq!(saved["remoteId"], "EDU-CRS-2024-00009");
        assert!(saved.get("erpnextId").is_none());
    }
}
