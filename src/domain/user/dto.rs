use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters."))]
    pub display_name: String,

    #[validate(length(max = 64, message = "Username cannot exceed 64 characters."))]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkCatalogAccountRequest {
    /// Numeric catalog account id.
    #[validate(length(min = 1, max = 20, message = "Catalog account id must be 1-20 digits."))]
    pub catalog_user_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileResponse {
    pub user_id: i64,
    pub display_name: String,
    pub username: Option<String>,
    pub rating: f64,
    pub total_ratings: i32,
    pub catalog_user_id: Option<String>,
    pub imported_votes: u64,
    pub created_slots: u64,
    pub participating_slots: u64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAccountResponse {
    pub user_id: i64,
    pub catalog_user_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportVotesResponse {
    pub stored: usize,
    pub pages: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessUserProfileResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: UserProfileResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessCatalogAccountResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: CatalogAccountResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessImportVotesResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: ImportVotesResponse,
}
