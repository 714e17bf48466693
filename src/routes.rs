use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use axum_extra::extract::Form;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{self, Caller};
use crate::catalog;
use crate::course;
use crate::db::Db;
use crate::enrollment;
use crate::error::AppResult;
use crate::models::{CourseForm, CourseStatus};
use crate::validate;

pub fn router(db: Db) -> Router {
    let instructor = Router::new()
        .route("/dashboard", get(instructor_dashboard))
        .route("/courses", get(instructor_courses).post(create_course))
        .route(
            "/courses/:id",
            get(instructor_course_detail).delete(delete_course),
        )
        .route("/courses/:id/edit", post(update_course))
        .route_layer(middleware::from_fn(auth::require_instructor));

    let student = Router::new()
        .route("/dashboard", get(student_dashboard))
        .route("/course/:id", get(student_course_detail))
        .route("/course/:id/enroll", post(enroll))
        .route("/course/:id/unenroll", delete(unenroll))
        .route("/course/:id/status", get(enrollment_status))
        .route(
            "/course/:id/lessons/:lesson_no/complete",
            post(complete_lesson),
        )
        .route_layer(middleware::from_fn(auth::require_student));

    Router::new()
        .route("/courses", get(catalog_courses))
        .route("/courses/:id", get(catalog_course))
        .route("/catalog/categories", get(categories))
        .route("/catalog/difficulty-levels", get(difficulty_levels))
        .nest("/instructor", instructor)
        .nest("/student", student)
        .layer(middleware::from_fn(auth::identity))
        .with_state(db)
}

// --- public catalog ---

async fn catalog_courses(State(db): State<Db>) -> AppResult<Json<serde_json::Value>> {
    let courses = catalog::published_courses(&db).await?;
    Ok(Json(json!({
        "success": true,
        "count": courses.len(),
        "data": courses,
    })))
}

async fn catalog_course(
    State(db): State<Db>,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let detail = course::fetch_detail(&db, course_id, None).await?;
    Ok(Json(json!({ "success": true, "data": detail })))
}

async fn categories(State(db): State<Db>) -> AppResult<Json<serde_json::Value>> {
    let rows = catalog::categories(&db).await?;
    Ok(Json(json!({ "success": true, "data": rows })))
}

async fn difficulty_levels(State(db): State<Db>) -> AppResult<Json<serde_json::Value>> {
    let rows = catalog::difficulty_levels(&db).await?;
    Ok(Json(json!({ "success": true, "data": rows })))
}

// --- instructor portal ---

async fn instructor_dashboard(
    State(db): State<Db>,
    caller: Caller,
) -> AppResult<Json<serde_json::Value>> {
    let courses = course::list_for_instructor(&db, caller.user_id).await?;
    let total_students = enrollment::distinct_student_count(&db, caller.user_id).await?;
    let total_courses = courses.len();

    Ok(Json(json!({
        "success": true,
        "data": {
            "courses": courses,
            "stats": {
                "totalCourses": total_courses,
                "totalStudents": total_students,
            },
        },
    })))
}

async fn instructor_courses(
    State(db): State<Db>,
    caller: Caller,
) -> AppResult<Json<serde_json::Value>> {
    let courses = course::list_for_instructor(&db, caller.user_id).await?;
    Ok(Json(json!({
        "success": true,
        "count": courses.len(),
        "data": courses,
    })))
}

async fn instructor_course_detail(
    State(db): State<Db>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let detail = course::fetch_detail(&db, course_id, None).await?;
    if detail.course.instructor_id != caller.user_id {
        return Err(crate::error::AppError::NotFoundOrForbidden);
    }
    Ok(Json(json!({ "success": true, "data": detail })))
}

async fn create_course(
    State(db): State<Db>,
    caller: Caller,
    Form(form): Form<CourseForm>,
) -> AppResult<Response> {
    let status = CourseStatus::parse(&form.status);
    let errors = validate::course_form(&form, status);
    if !errors.is_empty() {
        return Ok(editor_rejection(&form, &errors));
    }

    let write = validate::build_write(&form, status);
    let course_id = course::create(&db, caller.user_id, &write).await?;
    tracing::info!(%course_id, instructor_id = caller.user_id, "course created");

    Ok(Redirect::to("/instructor/courses?success=Course+created+successfully").into_response())
}

async fn update_course(
    State(db): State<Db>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
    Form(form): Form<CourseForm>,
) -> AppResult<Response> {
    let status = CourseStatus::parse(&form.status);
    let errors = validate::course_form(&form, status);
    if !errors.is_empty() {
        return Ok(editor_rejection(&form, &errors));
    }

    let write = validate::build_write(&form, status);
    course::update(&db, caller.user_id, course_id, &write).await?;
    tracing::info!(%course_id, instructor_id = caller.user_id, "course updated");

    Ok(Redirect::to("/instructor/courses?success=Course+updated+successfully").into_response())
}

async fn delete_course(
    State(db): State<Db>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    course::delete(&db, caller.user_id, course_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Course deleted successfully",
    })))
}

// --- student portal ---

async fn student_dashboard(
    State(db): State<Db>,
    caller: Caller,
) -> AppResult<Json<serde_json::Value>> {
    let rows = enrollment::enrolled_courses(&db, caller.user_id).await?;
    let data: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            json!({
                "id": row.id,
                "title": row.title,
                "description": row.description,
                "price": row.price,
                "enrolledAt": row.enrolled_at,
                "completedLessons": row.completed_lessons,
                "totalLessons": row.total_lessons,
                "progressPercent": course::percent(row.completed_lessons, row.total_lessons),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": data })))
}

async fn student_course_detail(
    State(db): State<Db>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let detail = course::fetch_detail(&db, course_id, Some(caller.user_id)).await?;
    Ok(Json(json!({ "success": true, "data": detail })))
}

async fn enroll(
    State(db): State<Db>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let enrollment = enrollment::enroll(&db, caller.user_id, course_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Enrolled successfully",
        "enrolledAt": enrollment.enrolled_at,
    })))
}

async fn unenroll(
    State(db): State<Db>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    enrollment::unenroll(&db, caller.user_id, course_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Unenrolled successfully",
    })))
}

async fn enrollment_status(
    State(db): State<Db>,
    caller: Caller,
    Path(course_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let status = enrollment::status(&db, caller.user_id, course_id).await?;
    Ok(Json(json!({ "success": true, "data": status })))
}

async fn complete_lesson(
    State(db): State<Db>,
    caller: Caller,
    Path((course_id, lesson_no)): Path<(Uuid, i32)>,
) -> AppResult<Json<serde_json::Value>> {
    enrollment::mark_lesson_complete(&db, caller.user_id, course_id, lesson_no).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Lesson marked complete",
    })))
}

// --- editor re-render ---

fn editor_rejection(form: &CourseForm, errors: &[String]) -> Response {
    (StatusCode::BAD_REQUEST, Html(render_editor(form, errors))).into_response()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Re-renders the course editor with the submitted values echoed back and
/// the field errors listed above the form.
fn render_editor(form: &CourseForm, errors: &[String]) -> String {
    let error_items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape(e)))
        .collect();

    let lesson_rows: String = (0..form.lesson_titles.len())
        .map(|i| {
            let field = |values: &[String]| {
                values.get(i).map(|v| escape(v)).unwrap_or_default()
            };
            format!(
                r#"<fieldset>
  <legend>Lesson {no}</legend>
  <label>Title <input name="lessonTitles[]" value="{title}"/></label>
  <label>Duration (mins) <input name="lessonDurations[]" value="{duration}"/></label>
  <label>Description <textarea name="lessonDescriptions[]">{description}</textarea></label>
  <label>Video URL <input name="lessonVideoUrls[]" value="{video}"/></label>
</fieldset>
"#,
                no = i + 1,
                title = field(&form.lesson_titles),
                duration = field(&form.lesson_durations),
                description = field(&form.lesson_descriptions),
                video = field(&form.lesson_video_urls),
            )
        })
        .collect();

    let (draft_selected, published_selected) = match CourseStatus::parse(&form.status) {
        CourseStatus::Draft => (" selected", ""),
        CourseStatus::Published => ("", " selected"),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset='utf-8'/>
  <title>Course Editor</title>
  <style>
    body{{font-family:sans-serif;max-width:720px;margin:2em auto}}
    .errors{{color:#b00020;border:1px solid #b00020;padding:.5em 1.5em;border-radius:4px}}
    label{{display:block;margin:.5em 0}}
    fieldset{{margin:1em 0}}
  </style>
</head>
<body>
<h1>Course Editor</h1>
<ul class='errors'>{error_items}</ul>
<form method='post'>
  <label>Title <input name="courseTitle" value="{title}"/></label>
  <label>Category <input name="courseCategory" value="{category}"/></label>
  <label>Difficulty <input name="courseDifficulty" value="{difficulty}"/></label>
  <label>Price <input name="coursePrice" value="{price}"/></label>
  <label>Description <textarea name="courseDescription">{description}</textarea></label>
  <label>Objectives <textarea name="courseObjectives">{objectives}</textarea></label>
  <label>Prerequisites <textarea name="coursePrerequisites">{prerequisites}</textarea></label>
  {lesson_rows}
  <label>Status
    <select name="courseStatus">
      <option value="draft"{draft_selected}>Draft</option>
      <option value="published"{published_selected}>Published</option>
    </select>
  </label>
  <button type='submit'>Save</button>
</form>
</body>
</html>"#,
        error_items = error_items,
        title = escape(&form.title),
        category = escape(&form.category),
        difficulty = escape(&form.difficulty),
        price = escape(&form.price),
        description = escape(&form.description),
        objectives = escape(&form.objectives.join("\n")),
        prerequisites = escape(&form.prerequisites.join("\n")),
        lesson_rows = lesson_rows,
        draft_selected = draft_selected,
        published_selected = published_selected,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::seed_instructor;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use sqlx::PgPool;
    use tower::ServiceExt;

    fn form_request(uri: &str, user_id: i64, role: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .header("x-user-id", user_id.to_string())
            .header("x-user-role", role)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[sqlx::test]
    async fn publish_without_a_lesson_rejects_and_writes_nothing(pool: PgPool) {
        let instructor = seed_instructor(&pool, "ada").await;
        let app = router(pool.clone());

        let body = "courseTitle=Rust+for+Web&courseCategory=1&courseDifficulty=1\
                    &coursePrice=49.99&courseDescription=Build+services&courseStatus=published";
        let res = app
            .oneshot(form_request("/instructor/courses", instructor, "instructor", body))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let page = res.into_body().collect().await.unwrap().to_bytes();
        let page = String::from_utf8(page.to_vec()).unwrap();
        assert!(page.contains("at least one lesson"));
        // The submitted values are echoed back into the form.
        assert!(page.contains("Rust for Web"));

        let courses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(courses, 0);
    }

    #[sqlx::test]
    async fn valid_draft_redirects_to_the_course_list(pool: PgPool) {
        let instructor = seed_instructor(&pool, "ada").await;
        let app = router(pool.clone());

        let body = "courseTitle=Rust+for+Web&courseCategory=1&courseDifficulty=1\
                    &coursePrice=49.99&courseDescription=Build+services&courseStatus=draft";
        let res = app
            .oneshot(form_request("/instructor/courses", instructor, "instructor", body))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers().get("location").unwrap().to_str().unwrap();
        assert!(location.starts_with("/instructor/courses?success="));

        let courses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(courses, 1);
    }

    #[sqlx::test]
    async fn instructor_routes_are_role_gated(pool: PgPool) {
        let app = router(pool.clone());

        let anonymous = Request::builder()
            .uri("/instructor/courses")
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(anonymous).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let wrong_role = Request::builder()
            .uri("/instructor/courses")
            .header("x-user-id", "1")
            .header("x-user-role", "student")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(wrong_role).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
