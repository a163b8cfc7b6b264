use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;

use imgocr_api::error::AppError;
use imgocr_api::storage::StorageError;
use imgocr_core::error::CoreError;
use imgocr_core::gateway::GatewayError;
use imgocr_core::job::QueueError;

async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn not_found_maps_to_404() {
    let id = uuid::Uuid::new_v4();
    let (status, json) = render(CoreError::NotFound { entity: "Image", id }.into()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["status_code"], 404);
    assert_eq!(json["detail"], format!("Image with id {id} not found"));
}

#[tokio::test]
async fn validation_and_format_errors_map_to_400() {
    let (status, json) = render(CoreError::Validation("Title must not be empty".into()).into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["detail"], "Title must not be empty");

    let (status, json) = render(CoreError::UnsupportedFormat("pdf".into()).into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn gateway_errors_map_to_404_and_502() {
    let id = uuid::Uuid::new_v4();
    let (status, json) = render(GatewayError::ImageNotFound(id).into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "IMAGE_NOT_FOUND");

    let (status, json) =
        render(GatewayError::UpstreamUnavailable("timeout".into()).into()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["detail"], "Image service unavailable");
}

#[tokio::test]
async fn internal_failures_are_sanitized() {
    for err in [
        AppError::InternalError("secret path /etc".into()),
        AppError::Database(sqlx::Error::PoolTimedOut),
        AppError::Queue(QueueError::Corrupt { id: uuid::Uuid::nil(), reason: "bad row".into() }),
        AppError::Storage(StorageError::InvalidRef("../x".into())),
    ] {
        let (status, json) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["detail"], "An internal error occurred");
    }
}

#[tokio::test]
async fn row_not_found_maps_to_404() {
    let (status, _) = render(sqlx::Error::RowNotFound.into()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn core_errors_convert_into_app_error() {
    let err: AppError = CoreError::Internal("x".into()).into();
    assert_matches!(err, AppError::Core(CoreError::Internal(_)));
}
