use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod context;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest(
            "/api/v1",
            api_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::context_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth_routes())
        .merge(people_routes())
        .merge(catalog_routes())
        .merge(content_routes())
        .merge(quiz_routes())
        .merge(progress_routes())
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/token", post(handlers::auth::login))
        .route("/token/refresh", post(handlers::auth::refresh_token))
        .route("/token/verify", post(handlers::auth::verify_token))
        .route("/users/login", post(handlers::auth::login))
}

fn people_routes() -> Router<Arc<AppState>> {
    use handlers::{authors, staff, users};

    Router::new()
        .route(
            "/users",
            get(users::list_users).post(users::register),
        )
        .route(
            "/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/change-password", post(users::change_password))
        .route("/users/{id}/confirm-email", post(users::confirm_email))
        .route(
            "/authors",
            get(authors::list_authors).post(authors::create_author),
        )
        .route("/authors/become-author", post(authors::become_author))
        .route(
            "/authors/{id}",
            get(authors::get_author)
                .patch(authors::update_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        .route("/authors/{id}/courses", get(authors::author_courses))
        .route("/authors/{id}/add-to-course", post(authors::add_to_course))
        .route(
            "/authors/{id}/remove-from-course",
            post(authors::remove_from_course),
        )
        .route(
            "/staff",
            get(staff::list_staff).post(staff::create_staff),
        )
        .route(
            "/staff/{id}",
            get(staff::get_staff)
                .patch(staff::update_staff)
                .put(staff::update_staff)
                .delete(staff::delete_staff),
        )
}

fn catalog_routes() -> Router<Arc<AppState>> {
    use handlers::{categories, courses};

    Router::new()
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .patch(categories::update_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/categories/{id}/courses", get(categories::category_courses))
        .route(
            "/courses",
            get(courses::list_courses).post(courses::create_course),
        )
        .route(
            "/courses/{id}",
            get(courses::get_course)
                .patch(courses::update_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/courses/{id}/publish", post(courses::publish_course))
        .route("/courses/{id}/unpublish", post(courses::unpublish_course))
        .route("/courses/{id}/add-categories", post(courses::add_categories))
        .route(
            "/courses/{id}/remove-categories",
            post(courses::remove_categories),
        )
        .route("/courses/{id}/statistics", get(courses::course_statistics))
        .route("/courses/{id}/chapters", get(courses::course_chapters))
}

fn content_routes() -> Router<Arc<AppState>> {
    use handlers::{chapters, editors, lessons, slides};

    Router::new()
        .route(
            "/chapters",
            get(chapters::list_chapters).post(chapters::create_chapter),
        )
        .route(
            "/chapters/{id}",
            get(chapters::get_chapter)
                .patch(chapters::update_chapter)
                .put(chapters::update_chapter)
                .delete(chapters::delete_chapter),
        )
        .route("/chapters/{id}/lessons", get(chapters::chapter_lessons))
        .route(
            "/lessons",
            get(lessons::list_lessons).post(lessons::create_lesson),
        )
        .route(
            "/lessons/{id}",
            get(lessons::get_lesson)
                .patch(lessons::update_lesson)
                .put(lessons::update_lesson)
                .delete(lessons::delete_lesson),
        )
        .route("/lessons/{id}/reorder-slides", post(lessons::reorder_slides))
        .route(
            "/slides",
            get(slides::list_slides).post(slides::create_slide),
        )
        .route(
            "/slides/{id}",
            get(slides::get_slide)
                .patch(slides::update_slide)
                .put(slides::update_slide)
                .delete(slides::delete_slide),
        )
        .route("/slides/{id}/toggle-activity", post(slides::toggle_activity))
        .route(
            "/slides/{id}/increment-comments",
            post(slides::increment_comments),
        )
        .route(
            "/editors",
            get(editors::list_editors).post(editors::create_editor),
        )
        .route(
            "/editors/{id}",
            get(editors::get_editor)
                .patch(editors::update_editor)
                .put(editors::update_editor)
                .delete(editors::delete_editor),
        )
}

fn quiz_routes() -> Router<Arc<AppState>> {
    use handlers::{choices, questions};

    Router::new()
        .route(
            "/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route(
            "/questions/{id}",
            get(questions::get_question)
                .patch(questions::update_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .route("/questions/{id}/add-choice", post(questions::add_choice))
        .route(
            "/choices",
            get(choices::list_choices).post(choices::create_choice),
        )
        .route(
            "/choices/{id}",
            get(choices::get_choice)
                .patch(choices::update_choice)
                .put(choices::update_choice)
                .delete(choices::delete_choice),
        )
}

fn progress_routes() -> Router<Arc<AppState>> {
    use handlers::{streaks, user_courses, user_responses};

    Router::new()
        .route(
            "/user-courses",
            get(user_courses::list_user_courses).post(user_courses::create_user_course),
        )
        .route(
            "/user-courses/{id}",
            get(user_courses::get_user_course)
                .patch(user_courses::update_user_course)
                .put(user_courses::update_user_course)
                .delete(user_courses::delete_user_course),
        )
        .route(
            "/user-courses/{id}/update-progress",
            post(user_courses::update_progress),
        )
        .route(
            "/streaks",
            get(streaks::list_streaks).post(streaks::create_streak),
        )
        .route(
            "/streaks/record-interaction",
            post(streaks::record_own_interaction),
        )
        .route(
            "/streaks/{id}",
            get(streaks::get_streak)
                .patch(streaks::update_streak)
                .put(streaks::update_streak)
                .delete(streaks::delete_streak),
        )
        .route(
            "/streaks/{id}/record-interaction",
            post(streaks::record_interaction),
        )
        .route(
            "/user-responses",
            get(user_responses::list_user_responses)
                .post(user_responses::create_user_response),
        )
        .route(
            "/user-responses/{id}",
            get(user_responses::get_user_response)
                .patch(user_responses::update_user_response)
                .put(user_responses::update_user_response)
                .delete(user_responses::delete_user_response),
        )
}
