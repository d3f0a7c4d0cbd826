use crate::models::demand::DemandDao;
use crate::models::state::StateDao;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DemandCreateDto {
    pub floor: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StateCreateDto {
    pub floor: i64,
    pub vacant: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageDto {
    pub message: String,
}

impl MessageDto {
    pub fn new(message: &str) -> Self {
        MessageDto {
            message: message.to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponseDto {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DemandDto {
    pub id: i64,
    pub timestamp: Option<DateTime<Utc>>,
    pub floor: i64,
    pub source_address: String,
}

impl From<DemandDao> for DemandDto {
    fn from(dao: DemandDao) -> Self {
        DemandDto {
            id: dao.id,
            timestamp: dao.timestamp,
            floor: dao.floor,
            source_address: dao.source_address,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StateDto {
    pub id: i64,
    pub timestamp: Option<DateTime<Utc>>,
    pub floor: i64,
    pub vacant: bool,
    pub source_address: String,
}

impl From<StateDao> for StateDto {
    fn from(dao: StateDao) -> Self {
        StateDto {
            id: dao.id,
            timestamp: dao.timestamp,
            floor: dao.floor,
            vacant: dao.vacant,
            source_address: dao.source_address,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthyDto {
    pub healthy: bool,
    pub database_state: String,
    pub demand_count: i64,
    pub state_count: i64,
}
