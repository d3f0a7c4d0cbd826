use super::dto::{DemandCreateDto, DemandDto, ErrorResponseDto, MessageDto};
use super::{build_response, source_address, BODY_LIMIT};
use crate::error::ApiError;
use crate::models::demand;
use chrono::Utc;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use tracing::debug;
use warp::Filter;

pub fn routes(
    pool: &SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    create_demand(pool.clone()).or(list_demands(pool.clone()))
}

/// POST /demand
///
/// Store a floor call, stamped with the server time and the caller address
#[utoipa::path(
    post,
    path = "/demand",
    request_body = DemandCreateDto,
    responses(
        (status = 200, description = "Demand stored", body = MessageDto),
        (status = 411, description = "Missing Content-Length", body = ErrorResponseDto),
        (status = 422, description = "Malformed body", body = ErrorResponseDto),
        (status = 500, description = "Storage failure", body = ErrorResponseDto),
    )
)]
pub(crate) fn create_demand(
    pool: SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || pool.clone())
        .and(warp::path!("demand"))
        .and(warp::post())
        .and(warp::addr::remote())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .and_then(
            |pool: SqlitePool, remote: Option<SocketAddr>, body: DemandCreateDto| async move {
                let source = source_address(remote);
                let resp = demand::insert(&pool, body.floor, &source, Utc::now())
                    .await
                    .map(|dao| {
                        debug!(id = dao.id(), floor = dao.floor(), source = %source, "Stored demand");
                        MessageDto::new("Demand created")
                    })
                    .map_err(ApiError::from);
                build_response(resp)
            },
        )
        .boxed()
}

/// GET /demands
///
/// All stored demand readings, in insertion order
#[utoipa::path(
    get,
    path = "/demands",
    responses(
        (status = 200, description = "Stored demand readings", body = [DemandDto]),
        (status = 500, description = "Storage failure", body = ErrorResponseDto),
    )
)]
pub(crate) fn list_demands(
    pool: SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || pool.clone())
        .and(warp::path!("demands"))
        .and(warp::get())
        .and_then(|pool: SqlitePool| async move {
            let resp = demand::read(&pool)
                .await
                .map(|rows| rows.into_iter().map(DemandDto::from).collect::<Vec<_>>())
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

    fn remote() -> SocketAddr {
        "10.0.0.7:41000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_rest_create_demand() {
        // Prepare
        let (_dir, pool) = temp_db().await;
        let routes = routes(&pool).recover(handle_rejection);

        // Execute
        let before = Utc::now();
        let res = warp::test::request()
            .path("/demand")
            .method("POST")
            .remote_addr(remote())
            .json(&DemandCreateDto { floor: 5 })
            .reply(&routes)
            .await;
        let after = Utc::now();

        // Validate
        assert_eq!(200, res.status());
        let body: MessageDto = serde_json::from_slice(res.body()).unwrap();
        assert_eq!("Demand created", body.message);

        let rows = demand::read(&pool).await.unwrap();
        assert_eq!(1, rows.len());
        assert_eq!(5, rows[0].floor());
        assert_eq!("10.0.0.7", rows[0].source_address());
        let stored = rows[0].timestamp().unwrap();
        assert!(before <= stored && stored <= after);
    }

    #[tokio::test]
    async fn test_rest_create_demand_without_remote() {
        let (_dir, pool) = temp_db().await;
        let routes = routes(&pool).recover(handle_rejection);

        let res = warp::test::request()
            .path("/demand")
            .method("POST")
            .json(&DemandCreateDto { floor: -1 })
            .reply(&routes)
            .await;

        assert_eq!(200, res.status());
        let rows = demand::read(&pool).await.unwrap();
        assert_eq!(-1, rows[0].floor());
        assert_eq!(crate::rest::UNKNOWN_SOURCE, rows[0].source_address());
    }

    #[tokio::test]
    async fn test_rest_create_demand_malformed() {
        let (_dir, pool) = temp_db().await;
        let routes = routes(&pool).recover(handle_rejection);

        for body in [r#"{}"#, r#"{"floor":"five"}"#, r#"{"floor":2.5}"#, "floor=5"] {
            let res = warp::test::request()
                .path("/demand")
                .method("POST")
                .header("content-type", "application/json")
                .body(body)
                .reply(&routes)
                .await;
            assert_eq!(422, res.status(), "{}", body);
        }
        assert_eq!(0, demand::count(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_rest_create_demand_too_large() {
        let (_dir, pool) = temp_db().await;
        let routes = routes(&pool).recover(handle_rejection);

        let padding = " ".repeat(BODY_LIMIT as usize);
        let res = warp::test::request()
            .path("/demand")
            .method("POST")
            .header("content-type", "application/json")
            .body(format!(r#"{{"floor":5}}{}"#, padding))
            .reply(&routes)
            .await;

        assert_eq!(413, res.status());
    }

    #[tokio::test]
    async fn test_rest_list_demands() {
        // Prepare
        let (_dir, pool) = temp_db().await;
        demand::insert(&pool, 3, "10.0.0.1", Utc::now()).await.unwrap();
        demand::insert(&pool, 4, "10.0.0.2", Utc::now()).await.unwrap();
        let routes = routes(&pool).recover(handle_rejection);

        // Execute
        let res = warp::test::request().path("/demands").reply(&routes).await;

        // Validate
        assert_eq!(200, res.status());
        let body: Vec<DemandDto> = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(vec![3, 4], body.iter().map(|d| d.floor).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_rest_wrong_method() {
        let (_dir, pool) = temp_db().await;
        let routes = routes(&pool).recover(handle_rejection);

        let res = warp::test::request().path("/demand").reply(&routes).await;

        assert_eq!(405, res.status());
    }
}
