// Enrollment state and per-lesson progress for students.

use uuid::Uuid;

use crate::db::Db;
use crate::error::{AppError, AppResult};
use crate::models::{CourseStatus, EnrolledCourse, Enrollment, EnrollmentStatus};

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}

/// Enrolls a student in a published course. The existence pre-check gives
/// the friendly error; the unique constraint on (student_id, course_id)
/// backstops the race where two requests pass the check together.
pub async fn enroll(db: &Db, student_id: i64, course_id: Uuid) -> AppResult<Enrollment> {
    let status = sqlx::query_scalar::<_, CourseStatus>("SELECT status FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFoundOrForbidden)?;

    if status != CourseStatus::Published {
        return Err(AppError::CourseNotPublished);
    }

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;

    if existing.is_some() {
        return Err(AppError::AlreadyEnrolled);
    }

    let inserted = sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (student_id, course_id)
        VALUES ($1, $2)
        RETURNING id, student_id, course_id, enrolled_at
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_one(db)
    .await;

    match inserted {
        Ok(enrollment) => Ok(enrollment),
        Err(err) if is_unique_violation(&err) => Err(AppError::AlreadyEnrolled),
        Err(err) => Err(err.into()),
    }
}

pub async fn unenroll(db: &Db, student_id: i64, course_id: Uuid) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM enrollments WHERE student_id = $1 AND course_id = $2")
        .bind(student_id)
        .bind(course_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotEnrolled);
    }
    Ok(())
}

/// Absence is a normal answer here, not an error.
pub async fn status(db: &Db, student_id: i64, course_id: Uuid) -> AppResult<EnrollmentStatus> {
    let enrolled_at = sqlx::query_scalar(
        "SELECT enrolled_at FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;

    Ok(EnrollmentStatus {
        enrolled: enrolled_at.is_some(),
        enrolled_at,
    })
}

/// Marks a lesson complete for an enrolled student. Lessons are addressed
/// by course id and sequence number since lesson rows are replaced wholesale
/// on every course edit.
pub async fn mark_lesson_complete(
    db: &Db,
    student_id: i64,
    course_id: Uuid,
    lesson_no: i32,
) -> AppResult<()> {
    let lesson_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM course_lessons WHERE course_id = $1 AND lesson_no = $2",
    )
    .bind(course_id)
    .bind(lesson_no)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFoundOrForbidden)?;

    let enrolled = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;

    if enrolled.is_none() {
        return Err(AppError::EnrollmentRequired);
    }

    sqlx::query(
        r#"
        INSERT INTO lesson_progress (student_id, lesson_id, completed, completed_at)
        VALUES ($1, $2, TRUE, now())
        ON CONFLICT (student_id, lesson_id)
        DO UPDATE SET completed = TRUE, completed_at = now()
        "#,
    )
    .bind(student_id)
    .bind(lesson_id)
    .execute(db)
    .await?;

    Ok(())
}

/// Distinct students across all of an instructor's courses.
pub async fn distinct_student_count(db: &Db, instructor_id: i64) -> AppResult<i64> {
    let count = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT e.student_id)
        FROM enrollments e
        JOIN courses c ON e.course_id = c.id
        WHERE c.instructor_id = $1
        "#,
    )
    .bind(instructor_id)
    .fetch_one(db)
    .await?;

    Ok(count)
}

/// Student dashboard rows: each enrolled course with its lesson totals.
pub async fn enrolled_courses(db: &Db, student_id: i64) -> AppResult<Vec<EnrolledCourse>> {
    let rows = sqlx::query_as::<_, EnrolledCourse>(
        r#"
        SELECT c.id, c.title, c.description, c.price, e.enrolled_at,
               COUNT(DISTINCT cl.id) AS total_lessons,
               COUNT(DISTINCT lp.id) FILTER (WHERE lp.completed) AS completed_lessons
        FROM enrollments e
        JOIN courses c ON e.course_id = c.id
        LEFT JOIN course_lessons cl ON cl.course_id = c.id
        LEFT JOIN lesson_progress lp
               ON lp.lesson_id = cl.id AND lp.student_id = e.student_id
        WHERE e.student_id = $1
        GROUP BY c.id, e.enrolled_at
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course;
    use crate::models::CourseStatus;
    use crate::testutil::{course_write, lesson, seed_instructor, seed_student};
    use sqlx::PgPool;

    async fn published_course(pool: &PgPool, lessons: Vec<crate::models::NewLesson>) -> Uuid {
        let instructor = seed_instructor(pool, "ada").await;
        let write = course_write(CourseStatus::Published, lessons);
        course::create(pool, instructor, &write).await.unwrap()
    }

    #[sqlx::test]
    async fn double_enrollment_is_rejected(pool: PgPool) {
        let student = seed_student(&pool, "sam").await;
        let course_id = published_course(&pool, vec![lesson("A")]).await;

        enroll(&pool, student, course_id).await.unwrap();
        let err = enroll(&pool, student, course_id).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyEnrolled));

        let rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student)
        .bind(course_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(rows, 1);
    }

    #[sqlx::test]
    async fn draft_course_cannot_be_enrolled(pool: PgPool) {
        let student = seed_student(&pool, "sam").await;
        let instructor = seed_instructor(&pool, "ada").await;
        let write = course_write(CourseStatus::Draft, vec![]);
        let course_id = course::create(&pool, instructor, &write).await.unwrap();

        let err = enroll(&pool, student, course_id).await.unwrap_err();
        assert!(matches!(err, AppError::CourseNotPublished));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[sqlx::test]
    async fn unenroll_requires_an_enrollment(pool: PgPool) {
        let student = seed_student(&pool, "sam").await;
        let course_id = published_course(&pool, vec![lesson("A")]).await;

        let err = unenroll(&pool, student, course_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotEnrolled));

        enroll(&pool, student, course_id).await.unwrap();
        assert!(status(&pool, student, course_id).await.unwrap().enrolled);

        unenroll(&pool, student, course_id).await.unwrap();
        let after = status(&pool, student, course_id).await.unwrap();
        assert!(!after.enrolled);
        assert!(after.enrolled_at.is_none());
    }

    #[sqlx::test]
    async fn progress_reads_half_complete_course_as_fifty_percent(pool: PgPool) {
        let student = seed_student(&pool, "sam").await;
        let course_id = published_course(
            &pool,
            vec![lesson("A"), lesson("B"), lesson("C"), lesson("D")],
        )
        .await;

        enroll(&pool, student, course_id).await.unwrap();
        mark_lesson_complete(&pool, student, course_id, 1)
            .await
            .unwrap();
        mark_lesson_complete(&pool, student, course_id, 2)
            .await
            .unwrap();
        // Re-marking an already-completed lesson is a no-op.
        mark_lesson_complete(&pool, student, course_id, 2)
            .await
            .unwrap();

        let progress = course::progress_for(&pool, course_id, student).await.unwrap();
        assert_eq!(progress.completed_lessons, 2);
        assert_eq!(progress.total_lessons, 4);
        assert_eq!(progress.progress_percent, 50.0);
    }

    #[sqlx::test]
    async fn progress_on_lessonless_course_is_zero(pool: PgPool) {
        let student = seed_student(&pool, "sam").await;
        let instructor = seed_instructor(&pool, "ada").await;
        let write = course_write(CourseStatus::Draft, vec![]);
        let course_id = course::create(&pool, instructor, &write).await.unwrap();

        let progress = course::progress_for(&pool, course_id, student).await.unwrap();
        assert_eq!(progress.total_lessons, 0);
        assert_eq!(progress.progress_percent, 0.0);
    }

    #[sqlx::test]
    async fn progress_requires_enrollment(pool: PgPool) {
        let student = seed_student(&pool, "sam").await;
        let course_id = published_course(&pool, vec![lesson("A")]).await;

        let err = mark_lesson_complete(&pool, student, course_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EnrollmentRequired));
    }

    #[sqlx::test]
    async fn dashboard_counts_enrolled_students(pool: PgPool) {
        let instructor = seed_instructor(&pool, "ada").await;
        let write = course_write(CourseStatus::Published, vec![lesson("A")]);
        let course_id = course::create(&pool, instructor, &write).await.unwrap();

        let sam = seed_student(&pool, "sam").await;
        let kim = seed_student(&pool, "kim").await;
        enroll(&pool, sam, course_id).await.unwrap();
        enroll(&pool, kim, course_id).await.unwrap();

        assert_eq!(distinct_student_count(&pool, instructor).await.unwrap(), 2);

        let dashboard = enrolled_courses(&pool, sam).await.unwrap();
        assert_eq!(dashboard.len(), 1);
        assert_eq!(dashboard[0].total_lessons, 1);
        assert_eq!(dashboard[0].completed_lessons, 0);
    }
}
