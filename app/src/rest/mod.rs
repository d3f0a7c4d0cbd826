use crate::config::Config;
use crate::error::{AppError, ApiError};
use serde::Serialize;
use sqlx::SqlitePool;
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType};
use warp::{Filter, Rejection, Reply};

pub mod demand_routes;
pub mod doc_routes;
pub mod dto;
pub mod metric_routes;
pub mod state_routes;

/// Largest accepted request body in bytes
pub const BODY_LIMIT: u64 = 4096;
/// Source address stored when the transport exposes none
pub const UNKNOWN_SOURCE: &str = "unknown";

pub(crate) fn source_address(remote: Option<SocketAddr>) -> String {
    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_owned())
}

pub(crate) fn build_response<T: Serialize>(
    resp: Result<T, ApiError>,
) -> Result<warp::reply::Response, Rejection> {
    match resp {
        Ok(data) => Ok(warp::reply::json(&data).into_response()),
        Err(ApiError::Internal(err)) => {
            error!(%err, "Request failed");
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
            ))
        }
    }
}

fn error_reply(status: StatusCode, error: String) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&dto::ErrorResponseDto { error }), status)
        .into_response()
}

pub(crate) async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_owned())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_owned())
    } else if err.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "Content-Length header required".to_owned(),
        )
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected application/json".to_owned(),
        )
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_owned())
    } else {
        warn!(?err, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_owned(),
        )
    };
    Ok(error_reply(status, message))
}

/// All endpoints, with rejections mapped to JSON errors.
pub fn routes(pool: &SqlitePool) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    demand_routes::routes(pool)
        .or(state_routes::routes(pool))
        .or(metric_routes::routes(pool))
        .or(doc_routes::routes())
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Serves the API until ctrl-c.
pub async fn dispatch_server_daemon(pool: SqlitePool, config: &Config) -> Result<(), AppError> {
    let (addr, server) = warp::serve(routes(&pool)).try_bind_with_graceful_shutdown(
        config.server_addr(),
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(%e, "Failed listening for ctrl-c");
            }
        },
    )?;
    info!(%addr, "Starting webserver");
    server.await;
    info!("Webserver stopped");
    Ok(())
}
