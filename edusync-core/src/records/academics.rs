//! Programs, courses and the academic calendar.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields::{non_empty, Fields, Loose};
use super::{EntityKind, Mapping, Syncable, Unrecognized, DEFAULT_DEPARTMENT};

/// An academic program (`programs` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for ProgramRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        Ok(Mapping::new(
            EntityKind::Program,
            Fields::new()
                .opt("program_name", &self.name)
                .opt("program_code", &self.code)
                .opt("program_abbreviation", &abbreviation(&self.abbreviation, &self.code))
                .opt("description", &self.description)
                .flag("is_published", self.is_published)
                .flag("is_featured", self.is_featured)
                .build(),
        ))
    }
}

/// A course (`courses` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_scale: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for CourseRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        Ok(Mapping::new(
            EntityKind::Course,
            Fields::new()
                .opt("course_name", &self.name)
                .opt("course_code", &self.code)
                .opt("course_abbreviation", &abbreviation(&self.abbreviation, &self.code))
                .text_or("department", &self.department, DEFAULT_DEPARTMENT)
                .opt("course_intro", &self.description)
                .opt("default_grading_scale", &self.grading_scale)
                .build(),
        ))
    }
}

/// An academic year (`academic_years` collection), keyed by its name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYearRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for AcademicYearRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        let name = natural_key(&self.name)?;
        Ok(Mapping::keyed(
            EntityKind::AcademicYear,
            name.clone(),
            Fields::new()
                .put("academic_year_name", name)
                .opt("year_start_date", &self.start_date)
                .opt("year_end_date", &self.end_date)
                .build(),
        ))
    }
}

/// A term within an academic year (`academic_terms` collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicTermRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for AcademicTermRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        let name = natural_key(&self.name)?;
        Ok(Mapping::keyed(
            EntityKind::AcademicTerm,
            name.clone(),
            Fields::new()
                .put("term_name", name)
                .opt("academic_year", &self.academic_year)
                .opt("term_start_date", &self.start_date)
                .opt("term_end_date", &self.end_date)
                .build(),
        ))
    }
}

/// A room (`rooms` collection), keyed by its name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "remoteId", alias = "erpnextId", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<Loose<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Loose<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Syncable for RoomRecord {
    fn mapping(&self) -> Result<Mapping, Unrecognized> {
        let name = natural_key(&self.name)?;
        Ok(Mapping::keyed(
            EntityKind::Room,
            name.clone(),
            Fields::new()
                .put("room_name", name)
                .loose("room_number", &self.number)
                .loose("seating_capacity", &self.capacity)
                .opt("building", &self.building)
                .build(),
        ))
    }
}

fn natural_key(name: &Option<String>) -> Result<String, Unrecognized> {
    non_empty(name)
        .map(str::to_string)
        .ok_or(Unrecognized::MissingKey("name"))
}

/// Explicit abbreviation, else the code.
fn abbreviation(abbreviation: &Option<String>, code: &Option<String>) -> Option<String> {
    non_empty(abbreviation)
        .or_else(|| non_empty(code))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_program_mapping() {
        let record: ProgramRecord = serde_json::from_value(json!({
            "name": "Senior Secondary Science",
            "code": "SSS",
            "description": "Classes 11 and 12",
            "isPublished": true
        }))
        .unwrap();

        let mapping = record.mapping().unwrap();
        assert_eq!(mapping.kind, EntityKind::Program);
        assert_eq!(
            Value::Object(mapping.fields),
            json!({
                "program_name": "Senior Secondary Science",
                "program_code": "SSS",
                "program_abbreviation": "SSS",
                "description": "Classes 11 and 12",
                "is_published": 1,
                "is_featured": 0
            })
        );
    }

    #[test]
    fn test_course_mapping_prefers_explicit_abbreviation() {
        let record: CourseRecord = serde_json::from_value(json!({
            "name": "Physics",
            "code": "PHY-11",
            "abbreviation": "PHY",
            "gradingScale": "CBSE Grading"
        }))
        .unwrap();

        let mapping = record.mapping().unwrap();
        assert_eq!(mapping.fields["course_abbreviation"], "PHY");
        assert_eq!(mapping.fields["department"], DEFAULT_DEPARTMENT);
        assert_eq!(mapping.fields["default_grading_scale"], "CBSE Grading");
    }

    #[test]
    fn test_academic_year_is_keyed_by_name() {
        let record: AcademicYearRecord = serde_json::from_value(json!({
            "name": "2025-26",
            "startDate": "2025-06-01",
            "endDate": "2026-03-31"
        }))
        .unwrap();

        let mapping = record.mapping().unwrap();
        assert_eq!(mapping.kind, EntityKind::AcademicYear);
        assert_eq!(mapping.natural_key.as_deref(), Some("2025-26"));
        assert_eq!(mapping.fields["academic_year_name"], "2025-26");
        assert_eq!(mapping.fields["year_end_date"], "2026-03-31");
    }

    #[test]
    fn test_academic_term_mapping() {
        let record: AcademicTermRecord = serde_json::from_value(json!({
            "name": "2025-26 (Term 1)",
            "academicYear": "2025-26"
        }))
        .unwrap();

        let mapping = record.mapping().unwrap();
        assert_eq!(mapping.natural_key.as_deref(), Some("2025-26 (Term 1)"));
        assert_eq!(mapping.fields["academic_year"], "2025-26");
    }

    #[test]
    fn test_room_mapping_accepts_loose_numbers() {
        let record: RoomRecord = serde_json::from_value(json!({
            "name": "Physics Lab",
            "number": 101,
            "capacity": "40"
        }))
        .unwrap();

        let mapping = record.mapping().unwrap();
        assert_eq!(mapping.fields["room_number"], "101");
        assert_eq!(mapping.fields["seating_capacity"], 40);
        assert!(mapping.fields.get("building").is_none());
    }

    #[test]
    fn test_room_keeps_loose_numbers_as_written() {
        let input = json!({"name": "Physics Lab", "number": 101, "capacity": "40"});
        let record: RoomRecord = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&record).unwrap(), input);
    }

    #[test]
    fn test_natural_kinds_without_name_are_unrecognized() {
        assert_eq!(
            RoomRecord::default().mapping(),
            Err(Unrecognized::MissingKey("name"))
        );
        assert_eq!(
            AcademicYearRecord::default().mapping(),
            Err(Unrecognized::MissingKey("name"))
        );
    }
}
