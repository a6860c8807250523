use serde::{Deserialize, Serialize};

use crate::{auth::repo::User, pagination::PageInfo};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_cars: i64,
    pub total_inspections: i64,
    pub pending_cars: i64,
    pub pending_inspections: i64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: DashboardStats,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserFilterQuery {
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<User>,
    pub pagination: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleUpdateResponse {
    pub success: bool,
    pub message: String,
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilterQuery {
    pub status: Option<String>,
}
