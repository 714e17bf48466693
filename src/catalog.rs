// Public catalog reads and the lookup tables behind the editor dropdowns.

use crate::db::Db;
use crate::error::AppResult;
use crate::models::{Category, CourseStatus, CourseSummary, DifficultyLevel};

pub async fn published_courses(db: &Db) -> AppResult<Vec<CourseSummary>> {
    let courses = sqlx::query_as::<_, CourseSummary>(
        r#"
        SELECT c.id, c.title, c.instructor_id, c.category_id, c.difficulty_id,
               c.price, c.description, c.status, c.created_at, c.updated_at,
               cat.name AS category_name,
               dl.name AS difficulty_name,
               u.name AS instructor_name,
               COUNT(e.id) AS enrollment_count
        FROM courses c
        LEFT JOIN categories cat ON c.category_id = cat.id
        LEFT JOIN difficulty_levels dl ON c.difficulty_id = dl.id
        LEFT JOIN users u ON c.instructor_id = u.id
        LEFT JOIN enrollments e ON c.id = e.course_id
        WHERE c.status = $1
        GROUP BY c.id, cat.name, dl.name, u.name
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(CourseStatus::Published)
    .fetch_all(db)
    .await?;

    Ok(courses)
}

pub async fn categories(db: &Db) -> AppResult<Vec<Category>> {
    let rows = sqlx::query_as::<_, Category>(
        "SELECT id, name, description FROM categories ORDER BY name",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn difficulty_levels(db: &Db) -> AppResult<Vec<DifficultyLevel>> {
    let rows = sqlx::query_as::<_, DifficultyLevel>(
        "SELECT id, name, description FROM difficulty_levels ORDER BY id",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}
