use super::build_response;
use super::dto::HealthyDto;
use crate::error::DBError;
use crate::models::{self, demand, state};
use sqlx::SqlitePool;
use warp::Filter;

pub fn routes(
    pool: &SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    health(pool.clone())
}

async fn counts(pool: &SqlitePool) -> Result<(i64, i64), DBError> {
    models::check_schema(pool).await?;
    Ok((demand::count(pool).await?, state::count(pool).await?))
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service and database state", body = HealthyDto))
)]
pub(crate) fn health(
    pool: SqlitePool,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || pool.clone())
        .and(warp::path!("health"))
        .and(warp::get())
        .and_then(|pool: SqlitePool| async move {
            let ret = match counts(&pool).await {
                Ok((demand_count, state_count)) => HealthyDto {
                    healthy: true,
                    database_state: "ok".to_owned(),
                    demand_count,
                    state_count,
                },
                Err(e) => HealthyDto {
                    healthy: false,
                    database_state: e.to_string(),
                    demand_count: 0,
                    state_count: 0,
                },
            };
            build_response(Ok(ret))
        })
        .boxed()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::models::temp_db;
    use chrono::Utc;

    #[tokio::test]
    async fn test_rest_health() {
        // Prepare
        let (_dir, pool) = temp_db().await;
        demand::insert(&pool, 1, "a", Utc::now()).await.unwrap();
        let routes = routes(&pool);

        // Execute
        let res = warp::test::request().path("/health").reply(&routes).await;

        // Validate
        assert_eq!(200, res.status());
        let body: HealthyDto = serde_json::from_slice(res.body()).unwrap();
        assert!(body.healthy);
        assert_eq!((1, 0), (body.demand_count, body.state_count));
    }

    #[tokio::test]
    async fn test_rest_health_closed_database() {
        let (_dir, pool) = temp_db().await;
        pool.close().await;
        let routes = routes(&pool);

        let res = warp::test::request().path("/health").reply(&routes).await;

        assert_eq!(200, res.status());
        let body: HealthyDto = serde_json::from_slice(res.body()).unwrap();
        assert!(!body.healthy);
    }
}
