//! The local snapshot: every record, grouped by collection.
//!
//! # File format
//!
//! A single JSON object keyed by collection name. Each value is a list of
//! records in camelCase JSON:
//!
//! ```json
//! {
//!   "users": [{"id": "…", "role": "student", "firstName": "Asha"}],
//!   "programs": [{"name": "Science", "code": "SCI", "remoteId": "EDU-PRG-2025-00001"}],
//!   "student_groups": []
//! }
//! ```
//!
//! Missing or `null` collections load as empty lists, and every collection is
//! written back on save. Top-level keys this crate doesn't know are kept as-is.
//!
//! Each record is read on its own. One that doesn't fit its collection's shape
//! is kept as an [`Entry::Malformed`] and written back exactly as loaded, so a
//! single bad record never stops the rest of the snapshot from syncing.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::records::{
    AcademicTermRecord, AcademicYearRecord, AssessmentRecord, AttendanceRecord, CourseRecord,
    FeeRecord, GuardianRecord, InstructorRecord, ProgramRecord, RecordIds, RoomRecord,
    StudentRecord, UserRecord,
};

/// Named collections in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Students,
    Instructors,
    Guardians,
    Programs,
    Courses,
    AcademicYears,
    AcademicTerms,
    Rooms,
    StudentGroups,
    Attendance,
    Assessments,
    Fees,
}

impl Collection {
    pub const ALL: [Collection; 13] = [
        Collection::Users,
        Collection::Students,
        Collection::Instructors,
        Collection::Guardians,
        Collection::Programs,
        Collection::Courses,
        Collection::AcademicYears,
        Collection::AcademicTerms,
        Collection::Rooms,
        Collection::StudentGroups,
        Collection::Attendance,
        Collection::Assessments,
        Collection::Fees,
    ];

    /// Order of a full run. Programs and the calendar go before the records
    /// that reference them; `student_groups` is never synced.
    pub const SYNC_ORDER: [Collection; 12] = [
        Collection::Users,
        Collection::Programs,
        Collection::Courses,
        Collection::AcademicYears,
        Collection::AcademicTerms,
        Collection::Rooms,
        Collection::Students,
        Collection::Instructors,
        Collection::Guardians,
        Collection::Attendance,
        Collection::Assessments,
        Collection::Fees,
    ];

    /// Key of the collection in the snapshot file.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Students => "students",
            Collection::Instructors => "instructors",
            Collection::Guardians => "guardians",
            Collection::Programs => "programs",
            Collection::Courses => "courses",
            Collection::AcademicYears => "academic_years",
            Collection::AcademicTerms => "academic_terms",
            Collection::Rooms => "rooms",
            Collection::StudentGroups => "student_groups",
            Collection::Attendance => "attendance",
            Collection::Assessments => "assessments",
            Collection::Fees => "fees",
        }
    }

    pub fn parse(name: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Whether full runs push this collection to the remote.
    pub fn is_synced(&self) -> bool {
        !matches!(self, Collection::StudentGroups)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One element of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<R> {
    Record(R),
    /// JSON that doesn't fit the record type, with the reason
    Malformed { raw: Value, error: String },
}

impl<R> Entry<R> {
    pub fn record(&self) -> Option<&R> {
        match self {
            Entry::Record(record) => Some(record),
            Entry::Malformed { .. } => None,
        }
    }

    pub fn record_mut(&mut self) -> Option<&mut R> {
        match self {
            Entry::Record(record) => Some(record),
            Entry::Malformed { .. } => None,
        }
    }

    /// Why the element could not be read, if it couldn't.
    pub fn error(&self) -> Option<&str> {
        match self {
            Entry::Record(_) => None,
            Entry::Malformed { error, .. } => Some(error),
        }
    }
}

impl<R> From<R> for Entry<R> {
    fn from(record: R) -> Self {
        Entry::Record(record)
    }
}

/// Malformed entries answer from their raw `id` and `remoteId` (or legacy
/// `erpnextId`) keys.
impl<R: RecordIds> RecordIds for Entry<R> {
    fn local_id(&self) -> Option<&str> {
        match self {
            Entry::Record(record) => record.local_id(),
            Entry::Malformed { raw, .. } => raw_text(raw, "id"),
        }
    }

    fn set_local_id(&mut self, id: String) {
        match self {
            Entry::Record(record) => record.set_local_id(id),
            Entry::Malformed { raw, .. } => set_raw_text(raw, "id", id),
        }
    }

    fn remote_id(&self) -> Option<&str> {
        match self {
            Entry::Record(record) => record.remote_id(),
            Entry::Malformed { raw, .. } => raw_text(raw, "remoteId")
                .or_else(|| raw_text(raw, "erpnextId"))
                .filter(|id| !id.is_empty()),
        }
    }

    fn set_remote_id(&mut self, id: String) {
        match self {
            Entry::Record(record) => record.set_remote_id(id),
            Entry::Malformed { raw, .. } => set_raw_text(raw, "remoteId", id),
        }
    }
}

fn raw_text<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

fn set_raw_text(raw: &mut Value, key: &str, text: String) {
    if let Value::Object(fields) = raw {
        fields.insert(key.to_string(), Value::String(text));
    }
}

impl<R: Serialize> Serialize for Entry<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entry::Record(record) => record.serialize(serializer),
            Entry::Malformed { raw, .. } => raw.serialize(serializer),
        }
    }
}

impl<'de, R: DeserializeOwned> Deserialize<'de> for Entry<R> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        let parsed = R::deserialize(&raw);
        Ok(match parsed {
            Ok(record) => Entry::Record(record),
            Err(e) => Entry::Malformed {
                error: e.to_string(),
                raw,
            },
        })
    }
}

fn list_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Every local record, as loaded from and saved to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    #[serde(deserialize_with = "list_or_null")]
    pub users: Vec<Entry<UserRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub students: Vec<Entry<StudentRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub instructors: Vec<Entry<InstructorRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub guardians: Vec<Entry<GuardianRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub programs: Vec<Entry<ProgramRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub courses: Vec<Entry<CourseRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub academic_years: Vec<Entry<AcademicYearRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub academic_terms: Vec<Entry<AcademicTermRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub rooms: Vec<Entry<RoomRecord>>,
    /// Stored and preserved, never synced
    #[serde(deserialize_with = "list_or_null")]
    pub student_groups: Vec<Value>,
    #[serde(deserialize_with = "list_or_null")]
    pub attendance: Vec<Entry<AttendanceRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub assessments: Vec<Entry<AssessmentRecord>>,
    #[serde(deserialize_with = "list_or_null")]
    pub fees: Vec<Entry<FeeRecord>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Snapshot {
    /// Number of records in a collection.
    pub fn len_of(&self, collection: Collection) -> usize {
        match collection {
            Collection::Users => self.users.len(),
            Collection::Students => self.students.len(),
            Collection::Instructors => self.instructors.len(),
            Collection::Guardians => self.guardians.len(),
            Collection::Programs => self.programs.len(),
            Collection::Courses => self.courses.len(),
            Collection::AcademicYears => self.academic_years.len(),
            Collection::AcademicTerms => self.academic_terms.len(),
            Collection::Rooms => self.rooms.len(),
            Collection::StudentGroups => self.student_groups.len(),
            Collection::Attendance => self.attendance.len(),
            Collection::Assessments => self.assessments.len(),
            Collection::Fees => self.fees.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        Collection::ALL.iter().all(|c| self.len_of(*c) == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_parse_roundtrip() {
        for collection in Collection::ALL {
            assert_eq!(Collection::parse(collection.name()), Some(collection));
        }
        assert_eq!(Collection::parse("teachers"), None);
    }

    #[test]
    fn test_sync_order_skips_student_groups() {
        assert!(!Collection::SYNC_ORDER.contains(&Collection::StudentGroups));
        assert!(!Collection::StudentGroups.is_synced());
        assert_eq!(Collection::SYNC_ORDER[0], Collection::Users);
        assert_eq!(Collection::SYNC_ORDER[11], Collection::Fees);
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "students": [{"firstName": "A", "lastName": "B"}]
        }))
        .unwrap();

        assert_eq!(snapshot.students.len(), 1);
        assert!(snapshot.users.is_empty());
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_save_writes_every_collection() {
        let value = serde_json::to_value(Snapshot::default()).unwrap();
        let object = value.as_object().unwrap();
        for collection in Collection::ALL {
            assert_eq!(object[collection.name()], json!([]), "{}", collection);
        }
    }

    #[test]
    fn test_unknown_top_level_keys_are_preserved() {
        let input = json!({
            "student_groups": [{"name": "10-A", "students": ["x"]}],
            "announcements": [{"title": "Holiday"}]
        });
        let snapshot: Snapshot = serde_json::from_value(input).unwrap();
        assert_eq!(snapshot.student_groups.len(), 1);

        let saved = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(saved["announcements"][0]["title"], "Holiday");
        assert_eq!(saved["student_groups"][0]["name"], "10-A");
    }

    #[test]
    fn test_null_collection_loads_as_empty() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "users": null,
            "programs": [{"name": "Science"}]
        }))
        .unwrap();
        assert!(snapshot.users.is_empty());
        assert_eq!(snapshot.programs.len(), 1);
    }

    #[test]
    fn test_malformed_record_is_kept_beside_valid_ones() {
        let bad = json!({
            "id": "s2",
            "firstName": "B",
            "isActive": "yes",
            "remoteId": "EDU-STU-2025-00002"
        });
        let snapshot: Snapshot = serde_json::from_value(json!({
            "students": [
                {"id": "s1", "firstName": "A"},
                bad.clone(),
                {"id": "s3", "firstName": "C"}
            ]
        }))
        .unwrap();

        assert!(snapshot.students[0].record().is_some());
        assert!(snapshot.students[1].record().is_none());
        assert!(snapshot.students[1].error().unwrap().contains("expected a boolean"));
        assert_eq!(snapshot.students[1].local_id(), Some("s2"));
        assert_eq!(snapshot.students[1].remote_id(), Some("EDU-STU-2025-00002"));
        assert!(snapshot.students[2].record().is_some());

        let saved = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(saved["students"][1], bad);
    }
}
