use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;

use crate::handlers::images;
use crate::state::ImageState;

/// Image CRUD routes. Paths keep their trailing slash.
///
/// The body limit only applies here; multipart uploads are the sole large
/// request bodies the service accepts.
pub fn router(max_upload_bytes: usize) -> Router<ImageState> {
    Router::new()
        .route(
            "/api/images/",
            get(images::list_images).post(images::create_image),
        )
        .route(
            "/api/images/{id}/",
            get(images::get_image).delete(images::delete_image),
        )
        .route("/api/images/{id}/api-data/", get(images::image_api_data))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
