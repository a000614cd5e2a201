// Chapter order assignment against a real MongoDB.
// Marked #[ignore]; run with TEST_MONGO_URI pointing at a disposable instance:
//   TEST_MONGO_URI=mongodb://localhost:27017 cargo test --test ordering_tests -- --ignored

use learnhub_api::{
    context::RequestContext,
    models::{chapter::CreateChapterRequest, course::CreateCourseRequest},
    services::{chapter_service::ChapterService, course_service::CourseService, indexes},
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

async fn test_database() -> mongodb::Database {
    let uri = std::env::var("TEST_MONGO_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let client = mongodb::Client::with_uri_str(&uri)
        .await
        .expect("Failed to create MongoDB client");
    let db = client.database(&format!("learnhub_ordering_{}", ObjectId::new().to_hex()));
    indexes::ensure_indexes(&db)
        .await
        .expect("Failed to create indexes");
    db
}

fn chapter_request(course_id: &str, title: &str) -> CreateChapterRequest {
    serde_json::from_value(json!({ "course": course_id, "title": title })).unwrap()
}

#[tokio::test]
#[ignore]
async fn test_sequential_chapters_get_orders_one_and_two() {
    let db = test_database().await;
    let staff = RequestContext::user(ObjectId::new(), true);

    let course: CreateCourseRequest = serde_json::from_value(json!({
        "title": "Rust from scratch",
        "duration": 10,
        "level": "elementary",
        "price": 0.0,
        "logo": "https://example.com/logo.png",
        "video_url": "https://example.com/intro.mp4",
        "language": "en",
        "is_active": true
    }))
    .unwrap();
    let course = CourseService::new(db.clone())
        .create(&staff, course)
        .await
        .expect("Failed to create course");

    let chapters = ChapterService::new(db.clone());
    let first = chapters
        .create(&staff, chapter_request(&course.id, "Ownership"))
        .await
        .expect("Failed to create first chapter");
    let second = chapters
        .create(&staff, chapter_request(&course.id, "Borrowing"))
        .await
        .expect("Failed to create second chapter");

    assert_eq!(first.order, 1);
    assert_eq!(second.order, 2);

    // an explicit order already taken in the course is a conflict
    let mut taken = chapter_request(&course.id, "Lifetimes");
    taken.order = Some(2);
    assert!(chapters.create(&staff, taken).await.is_err());

    db.drop().await.expect("Failed to drop test database");
}
