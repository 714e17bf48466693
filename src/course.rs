// Course aggregate: one course row plus its lessons, objectives and
// prerequisites, written and read as a unit.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::models::{CourseDetail, CourseSummary, CourseWrite, Lesson, ProgressSummary};

/// Inserts the course row and its child collections in one transaction.
/// Returns the generated course id.
pub async fn create(db: &Db, instructor_id: i64, write: &CourseWrite) -> AppResult<Uuid> {
    let mut tx = db.begin().await?;

    let course_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO courses (id, title, instructor_id, category_id, difficulty_id,
                             price, description, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(course_id)
    .bind(&write.patch.title)
    .bind(instructor_id)
    .bind(write.patch.category_id)
    .bind(write.patch.difficulty_id)
    .bind(write.patch.price)
    .bind(&write.patch.description)
    .bind(write.patch.status)
    .execute(&mut *tx)
    .await?;

    replace_children(&mut tx, course_id, write).await?;

    tx.commit().await?;
    Ok(course_id)
}

/// Updates the course row scoped to its owning instructor, then fully
/// replaces the child collections. Zero affected rows means the course does
/// not exist or belongs to someone else; the transaction is abandoned and
/// nothing is committed.
pub async fn update(
    db: &Db,
    instructor_id: i64,
    course_id: Uuid,
    write: &CourseWrite,
) -> AppResult<()> {
    let mut tx = db.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE courses
        SET title = $1, category_id = $2, difficulty_id = $3, price = $4,
            description = $5, status = $6, updated_at = now()
        WHERE id = $7 AND instructor_id = $8
        "#,
    )
    .bind(&write.patch.title)
    .bind(write.patch.category_id)
    .bind(write.patch.difficulty_id)
    .bind(write.patch.price)
    .bind(&write.patch.description)
    .bind(write.patch.status)
    .bind(course_id)
    .bind(instructor_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFoundOrForbidden);
    }

    replace_children(&mut tx, course_id, write).await?;

    tx.commit().await?;
    Ok(())
}

/// Full replace: delete everything, re-insert in submission order. Lessons
/// are renumbered 1..N here regardless of any client-supplied numbering.
async fn replace_children(
    tx: &mut Transaction<'_, Postgres>,
    course_id: Uuid,
    write: &CourseWrite,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM course_lessons WHERE course_id = $1")
        .bind(course_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM course_objectives WHERE course_id = $1")
        .bind(course_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM course_prerequisites WHERE course_id = $1")
        .bind(course_id)
        .execute(&mut **tx)
        .await?;

    for (index, lesson) in write.lessons.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO course_lessons (id, course_id, lesson_no, title,
                                        duration_mins, description, video_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course_id)
        .bind(index as i32 + 1)
        .bind(&lesson.title)
        .bind(lesson.duration_mins)
        .bind(&lesson.description)
        .bind(&lesson.video_url)
        .execute(&mut **tx)
        .await?;
    }

    for objective in &write.objectives {
        sqlx::query("INSERT INTO course_objectives (course_id, objective) VALUES ($1, $2)")
            .bind(course_id)
            .bind(objective)
            .execute(&mut **tx)
            .await?;
    }

    for prerequisite in &write.prerequisites {
        sqlx::query("INSERT INTO course_prerequisites (course_id, prerequisite) VALUES ($1, $2)")
            .bind(course_id)
            .bind(prerequisite)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Deletes a course scoped to its owning instructor. Child rows,
/// enrollments and progress go with it via cascading foreign keys.
pub async fn delete(db: &Db, instructor_id: i64, course_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1 AND instructor_id = $2")
        .bind(course_id)
        .bind(instructor_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFoundOrForbidden);
    }
    Ok(())
}

pub async fn list_for_instructor(db: &Db, instructor_id: i64) -> AppResult<Vec<CourseSummary>> {
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
        WHERE c.instructor_id = $1
        GROUP BY c.id, cat.name, dl.name, u.name
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(instructor_id)
    .fetch_all(db)
    .await?;

    Ok(courses)
}

/// Assembles the aggregate: summary row, ordered lessons, objective and
/// prerequisite lines, and the requesting student's progress when a student
/// id is supplied. An existing course with empty child collections is a
/// valid draft state, distinct from not-found.
pub async fn fetch_detail(
    db: &Db,
    course_id: Uuid,
    student_id: Option<i64>,
) -> AppResult<CourseDetail> {
    let summary = sqlx::query_as::<_, CourseSummary>(
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
        WHERE c.id = $1
        GROUP BY c.id, cat.name, dl.name, u.name
        "#,
    )
    .bind(course_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFoundOrForbidden)?;

    let lessons = sqlx::query_as::<_, Lesson>(
        r#"
        SELECT id, course_id, lesson_no, title, duration_mins, description, video_url
        FROM course_lessons
        WHERE course_id = $1
        ORDER BY lesson_no
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    let objectives = sqlx::query_scalar::<_, String>(
        "SELECT objective FROM course_objectives WHERE course_id = $1 ORDER BY id",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    let prerequisites = sqlx::query_scalar::<_, String>(
        "SELECT prerequisite FROM course_prerequisites WHERE course_id = $1 ORDER BY id",
    )
    .bind(course_id)
    .fetch_all(db)
    .await?;

    let progress = match student_id {
        Some(student_id) => Some(progress_for(db, course_id, student_id).await?),
        None => None,
    };

    Ok(CourseDetail {
        course: summary,
        lessons,
        objectives,
        prerequisites,
        progress,
    })
}

pub async fn progress_for(
    db: &Db,
    course_id: Uuid,
    student_id: i64,
) -> Result<ProgressSummary, sqlx::Error> {
    let total_lessons: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM course_lessons WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(db)
            .await?;

    let completed_lessons: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM lesson_progress lp
        JOIN course_lessons cl ON lp.lesson_id = cl.id
        WHERE cl.course_id = $1 AND lp.student_id = $2 AND lp.completed
        "#,
    )
    .bind(course_id)
    .bind(student_id)
    .fetch_one(db)
    .await?;

    Ok(ProgressSummary {
        completed_lessons,
        total_lessons,
        progress_percent: percent(completed_lessons, total_lessons),
    })
}

/// Completion percentage rounded to one decimal place; 0 for a course with
/// no lessons yet.
pub fn percent(completed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64 * 1000.0).round() / 10.0
}
