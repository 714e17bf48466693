// Seeding helpers shared by the database tests. Categories and difficulty
// levels come from the seed migration, so fixtures only add users and
// course payloads.

use crate::db::Db;
use crate::models::{CoursePatch, CourseStatus, CourseWrite, NewLesson};

pub async fn seed_user(db: &Db, name: &str, role: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING id")
        .bind(name)
        .bind(format!("{name}@example.com"))
        .bind(role)
        .fetch_one(db)
        .await
        .expect("failed to seed user")
}

pub async fn seed_instructor(db: &Db, name: &str) -> i64 {
    seed_user(db, name, "instructor").await
}

pub async fn seed_student(db: &Db, name: &str) -> i64 {
    seed_user(db, name, "student").await
}

pub fn lesson(title: &str) -> NewLesson {
    NewLesson {
        title: title.to_string(),
        duration_mins: Some(10),
        description: format!("About {title}"),
        video_url: format!("https://videos.example.com/{title}"),
    }
}

pub fn course_write(status: CourseStatus, lessons: Vec<NewLesson>) -> CourseWrite {
    CourseWrite {
        patch: CoursePatch {
            title: "Rust for Web".to_string(),
            category_id: 1,
            difficulty_id: 1,
            price: 49.99,
            description: "Build services in Rust".to_string(),
            status,
        },
        lessons,
        objectives: Vec::new(),
        prerequisites: Vec::new(),
    }
}
