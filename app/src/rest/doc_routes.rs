use super::dto;
use super::{demand_routes, metric_routes, state_routes};
use std::sync::Arc;
use utoipa::OpenApi;
use warp::Filter;

#[derive(OpenApi)]
#[openapi(
    paths(
        demand_routes::create_demand,
        demand_routes::list_demands,
        state_routes::create_state,
        state_routes::list_states,
        metric_routes::health,
    ),
    components(schemas(
        dto::DemandCreateDto,
        dto::StateCreateDto,
        dto::MessageDto,
        dto::ErrorResponseDto,
        dto::DemandDto,
        dto::StateDto,
        dto::HealthyDto,
    )),
    tags((name = "elevator", description = "Elevator demand and state ingestion"))
)]
pub struct ApiDoc;

/// GET /api/doc/api.json
pub fn routes() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let api = Arc::new(ApiDoc::openapi());
    warp::path!("api" / "doc" / "api.json")
        .and(warp::get())
        .map(move || warp::reply::json(api.as_ref()))
}
