// Field validation and form normalization for the course editor.

use crate::models::{CourseForm, CoursePatch, CourseStatus, CourseWrite, NewLesson};

/// Malformed prices coerce to 0 so a half-filled draft can still be saved;
/// a value that parses but is negative is rejected by `course_form`.
pub fn parse_price(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

/// Durations are positive whole minutes or absent; anything else is NULL.
pub fn parse_duration(raw: &str) -> Option<i32> {
    raw.trim().parse().ok().filter(|mins: &i32| *mins > 0)
}

fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(|c: char| c == '-' || c == '*' || c == '\u{2022}')
        .trim_start()
}

/// Splits textarea input into clean lines: newline-delimited entries and
/// repeated form keys are treated alike, leading bullet markers are
/// stripped, and blank lines dropped.
pub fn normalize_lines(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|entry| entry.lines())
        .map(|line| strip_bullet(line.trim()).trim_end().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Zips the parallel lesson arrays by index. Rows without a title are
/// dropped; sequence numbers are assigned later, in array order.
pub fn lesson_rows(form: &CourseForm) -> Vec<NewLesson> {
    (0..form.lesson_titles.len())
        .map(|i| NewLesson {
            title: form.lesson_titles[i].trim().to_string(),
            duration_mins: form
                .lesson_durations
                .get(i)
                .and_then(|raw| parse_duration(raw)),
            description: form
                .lesson_descriptions
                .get(i)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            video_url: form
                .lesson_video_urls
                .get(i)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        })
        .filter(|lesson| !lesson.title.is_empty())
        .collect()
}

/// Checks a submitted course against the rules for its target status and
/// returns human-readable field errors. Draft saves only need the course
/// fields; publishing additionally needs one fully-populated lesson.
pub fn course_form(form: &CourseForm, status: CourseStatus) -> Vec<String> {
    let mut errors = Vec::new();

    if form.title.trim().is_empty() {
        errors.push("Course title is required.".to_string());
    }
    if form.category.trim().parse::<i32>().is_err() {
        errors.push("Course category is required.".to_string());
    }
    if form.difficulty.trim().parse::<i32>().is_err() {
        errors.push("Difficulty level is required.".to_string());
    }
    if form.description.trim().is_empty() {
        errors.push("Course description is required.".to_string());
    }
    if parse_price(&form.price) < 0.0 {
        errors.push("Price must not be negative.".to_string());
    }

    if status == CourseStatus::Published {
        let has_complete_lesson = lesson_rows(form).iter().any(|lesson| {
            lesson.duration_mins.is_some()
                && !lesson.description.is_empty()
                && !lesson.video_url.is_empty()
        });
        if !has_complete_lesson {
            errors.push(
                "A published course needs at least one lesson with a title, \
                 duration, description and video."
                    .to_string(),
            );
        }
    }

    errors
}

/// Builds the write payload once validation has passed.
pub fn build_write(form: &CourseForm, status: CourseStatus) -> CourseWrite {
    CourseWrite {
        patch: CoursePatch {
            title: form.title.trim().to_string(),
            category_id: form.category.trim().parse().unwrap_or_default(),
            difficulty_id: form.difficulty.trim().parse().unwrap_or_default(),
            price: parse_price(&form.price),
            description: form.description.trim().to_string(),
            status,
        },
        lessons: lesson_rows(form),
        objectives: normalize_lines(&form.objectives),
        prerequisites: normalize_lines(&form.prerequisites),
    }
}
