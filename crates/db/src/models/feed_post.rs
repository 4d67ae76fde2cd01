use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::user::UserRole;

/// Fixed set of feed categories. The wire tag, stored value and parse form
/// all use the snake_case name.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[sqlx(type_name = "feed_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeedCategory {
    PersonalCare,
    PersonalCareHygiene,
    OxygenSaturation,
    Weight,
    PulseRate,
    Temperature,
    BloodSugarLevel,
    BowelMovement,
    BodyMap,
    FoodIntake,
    FluidIntake,
    IncidentAccidentForm,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct FeedPost {
    pub id: Uuid,
    pub resident_id: Uuid,
    pub category: FeedCategory,
    pub message: String,
    pub posted_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Equal to `created_at` until the first edit.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct FeedPostWithAuthorRow {
    #[sqlx(flatten)]
    post: FeedPost,
    username: String,
    posted_by_name: String,
    role: UserRole,
}

/// A feed post joined with its author, as returned by listings. `payload`
/// carries the structured view of the legacy `message` text.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct FeedPostWithAuthor {
    #[serde(flatten)]
    #[ts(flatten)]
    pub post: FeedPost,
    pub username: String,
    pub posted_by_name: String,
    pub role: UserRole,
    pub payload: FeedPayload,
}

impl From<FeedPostWithAuthorRow> for FeedPostWithAuthor {
    fn from(row: FeedPostWithAuthorRow) -> Self {
        let payload = FeedPayload::from_legacy(row.post.category, &row.post.message);
        Self {
            post: row.post,
            username: row.username,
            posted_by_name: row.posted_by_name,
            role: row.role,
            payload,
        }
    }
}

/// Focal point of a body-map observation, as percentages of the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
pub struct FocalPoint {
    pub x: f64,
    pub y: f64,
}

/// The fixed sections of an incident/accident report. Sections left blank on
/// the form are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct IncidentReport {
    pub reporting: Option<String>,
    pub occurred: Option<String>,
    pub location: Option<String>,
    pub what_happened: Option<String>,
    pub category: Option<String>,
    pub witnesses: Option<String>,
    pub who_involved: Option<String>,
    pub injury_type: Option<String>,
    pub treatment: Option<String>,
    pub returned_to_work: Option<String>,
    pub absence_duration: Option<String>,
    pub completed_by: Option<String>,
    pub completed_on: Option<String>,
}

/// Structured view of a post's message. Body-map and incident posts fold
/// their sub-data into the message text on the legacy wire; everything else
/// is plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedPayload {
    Text { message: String },
    BodyMap { message: String, point: FocalPoint },
    Incident { report: IncidentReport },
}

/// Separator between the free text and the coordinate pair of a body-map
/// message: `<text>~<x>&<y>`.
const BODY_MAP_SEPARATOR: char = '~';

/// Section labels of the incident form, in wire order. The parser captures
/// the text between one label and the next.
const INCIDENT_SECTIONS: &[(&str, fn(&mut IncidentReport) -> &mut Option<String>)] = &[
    ("1.1 What are you reporting?", |r| &mut r.reporting),
    ("1.2 When did it happen?", |r| &mut r.occurred),
    ("1.3 Where did it happen?", |r| &mut r.location),
    ("1.4 What happened?", |r| &mut r.what_happened),
    ("1.5 What category best describes the incident?", |r| {
        &mut r.category
    }),
    ("1.6 Witnesses:", |r| &mut r.witnesses),
    ("2.1 Who was involved?", |r| &mut r.who_involved),
    (
        "2.2 What type of injury / illness / disease has been sustained?",
        |r| &mut r.injury_type,
    ),
    ("2.3 What treatment was provided?", |r| &mut r.treatment),
    (
        "2.4 Did the injured person go straight back to work afterwards?",
        |r| &mut r.returned_to_work,
    ),
    ("2.5 Duration of absence (if any):", |r| {
        &mut r.absence_duration
    }),
    ("3.1 Details of the person completing this form:", |r| {
        &mut r.completed_by
    }),
    ("3.2 Date form completed:", |r| &mut r.completed_on),
];

impl FeedPayload {
    /// Interpret a stored message according to its category. Messages that do
    /// not follow the category's serialized convention fall back to plain
    /// text rather than failing the read.
    pub fn from_legacy(category: FeedCategory, message: &str) -> Self {
        match category {
            FeedCategory::BodyMap => parse_body_map(message).unwrap_or_else(|| Self::Text {
                message: message.to_string(),
            }),
            FeedCategory::IncidentAccidentForm => Self::Incident {
                report: parse_incident(message),
            },
            _ => Self::Text {
                message: message.to_string(),
            },
        }
    }

    /// Fold the payload back into the single message text used on the wire
    /// and in the store.
    pub fn to_legacy_message(&self) -> String {
        match self {
            Self::Text { message } => message.clone(),
            Self::BodyMap { message, point } => {
                format!("{message}{BODY_MAP_SEPARATOR}{}&{}", point.x, point.y)
            }
            Self::Incident { report } => {
                let mut report = report.clone();
                INCIDENT_SECTIONS
                    .iter()
                    .map(|(label, access)| {
                        let value = access(&mut report)
                            .clone()
                            .unwrap_or_else(|| "N/A".to_string());
                        format!("{label} {value}")
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}

fn parse_body_map(message: &str) -> Option<FeedPayload> {
    let (text, coords) = message.rsplit_once(BODY_MAP_SEPARATOR)?;
    let (x, y) = coords.split_once('&')?;
    let point = FocalPoint {
        x: x.trim().parse().ok()?,
        y: y.trim().parse().ok()?,
    };
    Some(FeedPayload::BodyMap {
        message: text.to_string(),
        point,
    })
}

fn parse_incident(message: &str) -> IncidentReport {
    let mut report = IncidentReport::default();
    for (i, (label, access)) in INCIDENT_SECTIONS.iter().enumerate() {
        let Some(start) = message.find(label) else {
            continue;
        };
        let value_start = start + label.len();
        let value_end = INCIDENT_SECTIONS
            .iter()
            .skip(i + 1)
            .find_map(|(next_label, _)| message[value_start..].find(next_label))
            .map(|off| value_start + off)
            .unwrap_or(message.len());
        let value = message[value_start..value_end].trim();
        if !value.is_empty() && value != "N/A" {
            *access(&mut report) = Some(value.to_string());
        }
    }
    report
}

const FEED_POST_COLUMNS: &str =
    "id, resident_id, category, message, posted_by, created_at, updated_at";

impl FeedPost {
    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        resident_id: Uuid,
        category: FeedCategory,
        message: &str,
        posted_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FeedPost>(&format!(
            "INSERT INTO feed_posts (id, resident_id, category, message, posted_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {FEED_POST_COLUMNS}"
        ))
        .bind(id)
        .bind(resident_id)
        .bind(category)
        .bind(message)
        .bind(posted_by)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, FeedPost>(&format!(
            "SELECT {FEED_POST_COLUMNS} FROM feed_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// List a resident's posts joined with their authors, newest first.
    /// `category` and `date` narrow the listing; `date` matches the calendar
    /// date portion of `created_at`.
    pub async fn list_for_resident(
        pool: &SqlitePool,
        resident_id: Uuid,
        category: Option<FeedCategory>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<FeedPostWithAuthor>, sqlx::Error> {
        let mut sql = String::from(
            "SELECT p.id, p.resident_id, p.category, p.message, p.posted_by,
                    p.created_at, p.updated_at,
                    u.username, u.fullname AS posted_by_name, u.role
             FROM feed_posts p
             JOIN users u ON p.posted_by = u.id
             WHERE p.resident_id = ?",
        );
        if category.is_some() {
            sql.push_str(" AND p.category = ?");
        }
        if date.is_some() {
            sql.push_str(" AND date(p.created_at) = date(?)");
        }
        sql.push_str(" ORDER BY p.created_at DESC");

        let mut query = sqlx::query_as::<_, FeedPostWithAuthorRow>(&sql).bind(resident_id);
        if let Some(category) = category {
            query = query.bind(category);
        }
        if let Some(date) = date {
            query = query.bind(date);
        }

        let rows = query.fetch_all(pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Replace the message text. `created_at` is immutable; `updated_at` is
    /// refreshed.
    pub async fn update_message(
        pool: &SqlitePool,
        id: Uuid,
        message: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FeedPost>(&format!(
            "UPDATE feed_posts SET message = $2, updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {FEED_POST_COLUMNS}"
        ))
        .bind(id)
        .bind(message)
        .fetch_one(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM feed_posts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_resident_id<'e, E>(
        executor: E,
        resident_id: Uuid,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM feed_posts WHERE resident_id = $1")
            .bind(resident_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_author<'e, E>(executor: E, author_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM feed_posts WHERE posted_by = $1")
            .bind(author_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_category_parses_snake_case() {
        assert_eq!(
            FeedCategory::from_str("blood_sugar_level").unwrap(),
            FeedCategory::BloodSugarLevel
        );
        assert_eq!(
            FeedCategory::from_str("incident_accident_form").unwrap(),
            FeedCategory::IncidentAccidentForm
        );
        assert!(FeedCategory::from_str("not_a_real_category").is_err());
    }

    #[test]
    fn test_body_map_parse() {
        let payload = FeedPayload::from_legacy(FeedCategory::BodyMap, "Bruise on left arm~42.5&77");
        assert_eq!(
            payload,
            FeedPayload::BodyMap {
                message: "Bruise on left arm".to_string(),
                point: FocalPoint { x: 42.5, y: 77.0 },
            }
        );
    }

    #[test]
    fn test_body_map_without_coordinates_falls_back_to_text() {
        let payload = FeedPayload::from_legacy(FeedCategory::BodyMap, "no separator here");
        assert_eq!(
            payload,
            FeedPayload::Text {
                message: "no separator here".to_string()
            }
        );
    }

    #[test]
    fn test_body_map_roundtrip() {
        let payload = FeedPayload::BodyMap {
            message: "Graze on knee".to_string(),
            point: FocalPoint { x: 10.0, y: 20.5 },
        };
        let wire = payload.to_legacy_message();
        assert_eq!(wire, "Graze on knee~10&20.5");
        assert_eq!(FeedPayload::from_legacy(FeedCategory::BodyMap, &wire), payload);
    }

    #[test]
    fn test_incident_parse_skips_blank_sections() {
        let wire = "1.1 What are you reporting? Accident\n\
                    1.2 When did it happen? Jan 5, 2024\n\
                    1.3 Where did it happen? N/A\n\
                    1.4 What happened? Slipped in the hallway\n\
                    1.5 What category best describes the incident? Fall\n\
                    1.6 Witnesses: N/A\n\
                    2.1 Who was involved? N/A\n\
                    2.2 What type of injury / illness / disease has been sustained? Bruising\n\
                    2.3 What treatment was provided? Ice pack\n\
                    2.4 Did the injured person go straight back to work afterwards? N/A\n\
                    2.5 Duration of absence (if any): N/A\n\
                    3.1 Details of the person completing this form: J. Doe\n\
                    3.2 Date form completed: 2024-01-05";
        let FeedPayload::Incident { report } =
            FeedPayload::from_legacy(FeedCategory::IncidentAccidentForm, wire)
        else {
            panic!("expected incident payload");
        };
        assert_eq!(report.reporting.as_deref(), Some("Accident"));
        assert_eq!(report.what_happened.as_deref(), Some("Slipped in the hallway"));
        assert_eq!(report.location, None);
        assert_eq!(report.witnesses, None);
        assert_eq!(report.completed_on.as_deref(), Some("2024-01-05"));
    }

    #[test]
    fn test_incident_roundtrip() {
        let report = IncidentReport {
            reporting: Some("Near miss".to_string()),
            occurred: Some("May 2, 2024".to_string()),
            what_happened: Some("Wet floor, no fall".to_string()),
            completed_by: Some("A. Nurse".to_string()),
            ..Default::default()
        };
        let payload = FeedPayload::Incident { report };
        let wire = payload.to_legacy_message();
        assert_eq!(
            FeedPayload::from_legacy(FeedCategory::IncidentAccidentForm, &wire),
            payload
        );
    }
}
