use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Published,
}

impl CourseStatus {
    /// Unknown strings fall back to draft, matching the editor's default.
    pub fn parse(s: &str) -> CourseStatus {
        match s.trim() {
            "published" => CourseStatus::Published,
            _ => CourseStatus::Draft,
        }
    }
}

/// Course row joined with its lookup names and enrollment count, the shape
/// every listing and detail page works from.
#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub instructor_id: i64,
    pub category_id: i32,
    pub difficulty_id: i32,
    pub price: f64,
    pub description: String,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_name: Option<String>,
    pub difficulty_name: Option<String>,
    pub instructor_name: Option<String>,
    pub enrollment_count: i64,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub lesson_no: i32,
    pub title: String,
    pub duration_mins: Option<i32>,
    pub description: String,
    pub video_url: String,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
pub struct EnrollmentStatus {
    pub enrolled: bool,
    pub enrolled_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct ProgressSummary {
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub progress_percent: f64,
}

/// The full aggregate a reader assembles: the course row plus its ordered
/// child collections, and the requesting student's progress when known.
#[derive(Serialize, Debug, Clone)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: CourseSummary,
    pub lessons: Vec<Lesson>,
    pub objectives: Vec<String>,
    pub prerequisites: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressSummary>,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct DifficultyLevel {
    pub id: i32,
    pub name: String,
    pub description: String,
}

/// Per-course row on the student dashboard.
#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct EnrolledCourse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub enrolled_at: DateTime<Utc>,
    pub total_lessons: i64,
    pub completed_lessons: i64,
}

/// Course-level column set for a single write. One field per column; the
/// writer binds them all on every create and update rather than assembling
/// SET clauses per request.
#[derive(Debug, Clone)]
pub struct CoursePatch {
    pub title: String,
    pub category_id: i32,
    pub difficulty_id: i32,
    pub price: f64,
    pub description: String,
    pub status: CourseStatus,
}

/// Lesson row as submitted, before it is assigned a sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLesson {
    pub title: String,
    pub duration_mins: Option<i32>,
    pub description: String,
    pub video_url: String,
}

/// Everything one aggregate write replaces: the course columns plus the
/// three child collections in submission order.
#[derive(Debug, Clone)]
pub struct CourseWrite {
    pub patch: CoursePatch,
    pub lessons: Vec<NewLesson>,
    pub objectives: Vec<String>,
    pub prerequisites: Vec<String>,
}

/// Payload of the course editor form. Repeated keys (`lessonTitles[]`, ...)
/// arrive as parallel arrays zipped by index; objectives and prerequisites
/// may arrive either as repeated keys or as one newline-delimited textarea.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CourseForm {
    #[serde(rename = "courseTitle", default)]
    pub title: String,
    #[serde(rename = "courseCategory", default)]
    pub category: String,
    #[serde(rename = "courseDifficulty", default)]
    pub difficulty: String,
    #[serde(rename = "coursePrice", default)]
    pub price: String,
    #[serde(rename = "courseDescription", default)]
    pub description: String,
    #[serde(rename = "courseStatus", default)]
    pub status: String,
    #[serde(rename = "courseObjectives", alias = "courseObjectives[]", default)]
    pub objectives: Vec<String>,
    #[serde(rename = "coursePrerequisites", alias = "coursePrerequisites[]", default)]
    pub prerequisites: Vec<String>,
    #[serde(rename = "lessonTitles", alias = "lessonTitles[]", default)]
    pub lesson_titles: Vec<String>,
    #[serde(rename = "lessonDurations", alias = "lessonDurations[]", default)]
    pub lesson_durations: Vec<String>,
    #[serde(rename = "lessonDescriptions", alias = "lessonDescriptions[]", default)]
    pub lesson_descriptions: Vec<String>,
    #[serde(rename = "lessonVideoUrls", alias = "lessonVideoUrls[]", default)]
    pub lesson_video_urls: Vec<String>,
}
