use super::dto::{ErrorResponseDto, MessageDto, StateCreateDto, StateDto};
use super::{build_response, source_address, BODY_LIMIT};
use crate::error::ApiError;
use crate::models::state;
use chrono::Utc;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use tracing::debug;
use warp::Filter;

pub fn routes(
    pool: &SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    create_state(pool.clone()).or(list_states(pool.clone()))
}

/// POST /state
///
/// Store the elevator position and occupancy
#[utoipa::path(
    post,
    path = "/state",
    request_body = StateCreateDto,
    responses(
        (status = 200, description = "State stored", body = MessageDto),
        (status = 411, description = "Missing Content-Length", body = ErrorResponseDto),
        (status = 422, description = "Malformed body", body = ErrorResponseDto),
        (status = 500, description = "Storage failure", body = ErrorResponseDto),
    )
)]
pub(crate) fn create_state(
    pool: SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || pool.clone())
        .and(warp::path!("state"))
        .and(warp::post())
        .and(warp::addr::remote())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .and_then(
            |pool: SqlitePool, remote: Option<SocketAddr>, body: StateCreateDto| async move {
                let source = source_address(remote);
                let resp = state::insert(&pool, body.floor, body.vacant, &source, Utc::now())
                    .await
                    .map(|dao| {
                        debug!(id = dao.id(), floor = dao.floor(), vacant = dao.vacant(), "Stored state");
                        MessageDto::new("State created")
                    })
                    .map_err(ApiError::from);
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /states
#[utoipa::path(
    get,
    path = "/states",
    responses(
        (status = 200, description = "Stored state readings", body = [StateDto]),
        (status = 500, description = "Storage failure", body = ErrorResponseDto),
    )
)]
pub(crate) fn list_states(
    pool: SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || pool.clone())
        .and(warp::path!("states"))
        .and(warp::get())
        .and_then(|pool: SqlitePool| async move {
            let resp = state::read(&pool)
                .await
                .map(|rows| rows.into_iter().map(StateDto::from).collect::<Vec<_>>())
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

///
/// TEST
///
#[cfg(test)]
mod test {
    use super::*;
    use crate::models::temp_db;
    use crate::rest::handle_rejection;

    #[tokio::test]
    async fn test_rest_create_state() {
        // Prepare
        let (_dir, pool) = temp_db().await;
        let routes = routes(&pool).recover(handle_rejection);

        // Execute
        let before = Utc::now();
        let res = warp::test::request()
            .path("/state")
            .method("POST")
            .remote_addr("10.0.0.7:41001".parse().unwrap())
            .json(&StateCreateDto {
                floor: 2,
                vacant: true,
            })
            .reply(&routes)
            .await;
        let after = Utc::now();

        // Validate
        assert_eq!(200, res.status());
        let body: MessageDto = serde_json::from_slice(res.body()).unwrap();
        assert_eq!("State created", body.message);

        let rows = state::read(&pool).await.unwrap();
        assert_eq!(1, rows.len());
        assert_eq!((2, true), (rows[0].floor(), rows[0].vacant()));
        let stored = rows[0].timestamp.unwrap();
        assert!(before <= stored && stored <= after);
    }

    #[tokio::test]
    async fn test_rest_create_state_missing_vacant() {
        let (_dir, pool) = temp_db().await;
        let routes = routes(&pool).recover(handle_rejection);

        let res = warp::test::request()
            .path("/state")
            .method("POST")
            .header("content-type", "application/json")
            .body(r#"{"floor":2}"#)
            .reply(&routes)
            .await;

        assert_eq!(422, res.status());
        assert_eq!(0, state::count(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_rest_list_states() {
        // Prepare
        let (_dir, pool) = temp_db().await;
        state::insert(&pool, 1, false, "10.0.0.1", Utc::now())
            .await
            .unwrap();
        let routes = routes(&pool).recover(handle_rejection);

        // Execute
        let res = warp::test::request().path("/states").reply(&routes).await;

        // Validate
        assert_eq!(200, res.status());
        let body: Vec<StateDto> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(1, body.len());
        assert_eq!("10.0.0.1", body[0].source_address);
        assert!(!body[0].vacant);
    }
}
