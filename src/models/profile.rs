use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;

use super::null_as_empty;
use super::user::PublicUser;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub position: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub years: String,
}

/// Older documents spell the field-of-study key `filedOfStudy`. Both keys are
/// accepted on read; only `fieldOfStudy` is ever written back.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EducationEntry {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub school: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub degree: String,
    #[serde(rename = "fieldOfStudy", default, deserialize_with = "null_as_empty")]
    pub field_of_study: String,
    #[serde(rename = "filedOfStudy", default, deserialize_with = "null_as_empty")]
    legacy_field_of_study: String,
}

impl EducationEntry {
    pub fn new(school: &str, degree: &str, field_of_study: &str) -> Self {
        Self {
            school: school.to_string(),
            degree: degree.to_string(),
            field_of_study: field_of_study.to_string(),
            legacy_field_of_study: String::new(),
        }
    }

    /// Canonical key first, legacy key as fallback.
    pub fn field_of_study(&self) -> &str {
        if self.field_of_study.is_empty() {
            &self.legacy_field_of_study
        } else {
            &self.field_of_study
        }
    }
}

impl Serialize for EducationEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("EducationEntry", 3)?;
        st.serialize_field("school", &self.school)?;
        st.serialize_field("degree", &self.degree)?;
        st.serialize_field("fieldOfStudy", self.field_of_study())?;
        st.end()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub bio: String,
    pub current_post: String,
    pub past_work: Vec<WorkEntry>,
    pub education: Vec<EducationEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn from_row(r: &SqliteRow) -> Self {
        Self {
            id: r.get("id"),
            user_id: r.get("user_id"),
            bio: r.get("bio"),
            current_post: r.get("current_post"),
            past_work: r.get::<Json<Vec<WorkEntry>>, _>("past_work").0,
            education: r.get::<Json<Vec<EducationEntry>>, _>("education").0,
            created_at: r.get("created_at"),
            updated_at: r.get("updated_at"),
        }
    }
}

/// A profile with its owning user joined in.
#[derive(Serialize, Debug, Clone)]
pub struct ProfileWithUser {
    #[serde(flatten)]
    pub profile: Profile,
    pub user: Option<PublicUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_key_is_read_through_accessor() {
        let legacy: EducationEntry =
            serde_json::from_str(r#"{"school":"MIT","degree":"BSc","filedOfStudy":"Physics"}"#).unwrap();
        let canonical: EducationEntry =
            serde_json::from_str(r#"{"school":"MIT","degree":"BSc","fieldOfStudy":"Physics"}"#).unwrap();
        assert_eq!(legacy.field_of_study(), "Physics");
        assert_eq!(legacy.field_of_study(), canonical.field_of_study());
    }

    #[test]
    fn canonical_key_wins_when_both_present() {
        let e: EducationEntry =
            serde_json::from_str(r#"{"fieldOfStudy":"Maths","filedOfStudy":"Physics"}"#).unwrap();
        assert_eq!(e.field_of_study(), "Maths");
    }

    #[test]
    fn serialization_writes_only_canonical_key() {
        let e: EducationEntry = serde_json::from_str(r#"{"school":"MIT","filedOfStudy":"Physics"}"#).unwrap();
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["fieldOfStudy"], "Physics");
        assert!(json.get("filedOfStudy").is_none());
        assert_eq!(json["degree"], "");
    }

    #[test]
    fn null_fields_read_as_empty() {
        let w: WorkEntry = serde_json::from_str(r#"{"company":null,"years":"2019"}"#).unwrap();
        assert_eq!(w.company, "");
        assert_eq!(w.position, "");
        assert_eq!(w.years, "2019");
    }
}
