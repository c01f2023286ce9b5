use gloo::net::http::{Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{
    Branch, BranchSaveRequest, Collection, CollectionSaveRequest, CollectionUpdateRequest,
    ExistingCheck, LoginRequest, LoginResponse, Region, RegionSaveRequest, RegisterRequest,
    RegisterResponse, Role, Target, TargetSaveRequest, TargetUpdateRequest, UserAccount,
};
use std::fmt;
use web_sys::FormData;

use crate::services::session::Session;

/// Tagged failure for every backend call. NotFound is semantically
/// meaningful for the exact-period lookups and drives the reconciliation
/// flow; the other variants end up as user-visible notices.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    NotFound,
    Unauthorized,
    /// Rejected input; the server text says what was wrong with it.
    Validation(String),
    /// A record already exists where the request tried to create one.
    Conflict(String),
    /// Any other non-2xx response, with the server's message text verbatim.
    Server(String),
    /// Transport failure or unparseable body.
    Network(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::Unauthorized => write!(f, "Session expired. Please log in again."),
            ApiError::Validation(msg) => write!(f, "{msg}"),
            ApiError::Conflict(msg) => write!(f, "{msg}"),
            ApiError::Server(msg) => write!(f, "{msg}"),
            ApiError::Network(msg) => write!(f, "Network error: {msg}"),
        }
    }
}

/// API client for the console backend: one method per REST endpoint, no
/// business logic. The bearer token is attached from the session on every
/// authenticated call.
#[derive(Clone, PartialEq)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new() -> Self {
        Self {
            base_url: "http://localhost:3000/api/v1".to_string(),
        }
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self { base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(builder: RequestBuilder) -> RequestBuilder {
        match Session::token() {
            Some(token) => builder.header("Authorization", &format!("Bearer {token}")),
            None => builder,
        }
    }

    /// Map a settled response to Ok or a classified error. 404 is NotFound,
    /// 401/403 force re-authentication, 409 and 400/422 keep their meaning,
    /// and anything else non-2xx carries the server text verbatim.
    async fn classify(response: Response) -> Result<Response, ApiError> {
        if response.ok() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(match status {
            404 => ApiError::NotFound,
            401 | 403 => ApiError::Unauthorized,
            _ if text.is_empty() => ApiError::Server(format!("Server error {status}")),
            400 | 422 => ApiError::Validation(text),
            409 => ApiError::Conflict(text),
            _ => ApiError::Server(text),
        })
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to parse response: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = Self::authorize(Request::get(&self.url(path)))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::parse(Self::classify(response).await?).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = Self::authorize(Request::post(&self.url(path)))
            .json(body)
            .map_err(|e| ApiError::Network(format!("Failed to serialize request: {e}")))?
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::parse(Self::classify(response).await?).await
    }

    async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = Self::authorize(Request::put(&self.url(path)))
            .json(body)
            .map_err(|e| ApiError::Network(format!("Failed to serialize request: {e}")))?
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::parse(Self::classify(response).await?).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = Self::authorize(Request::delete(&self.url(path)))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::classify(response).await.map(|_| ())
    }

    /// Multipart upload; the server replies with human-readable status
    /// text, not structured data.
    async fn post_file(&self, path: &str, file: &web_sys::File) -> Result<String, ApiError> {
        let form = FormData::new().map_err(|_| ApiError::Network("FormData unavailable".into()))?;
        form.append_with_blob("file", file)
            .map_err(|_| ApiError::Network("Failed to attach file".into()))?;
        let response = Self::authorize(Request::post(&self.url(path)))
            .body(form)
            .map_err(|e| ApiError::Network(e.to_string()))?
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::classify(response)
            .await?
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    // ---- auth ----

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post_json("auth/login", request).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        self.post_json("auth/register", request).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserAccount>, ApiError> {
        self.get_json("auth/admin/users").await
    }

    pub async fn create_admin(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        self.post_json("auth/admin/create-admin", request).await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("auth/admin/delete-user/{user_id}")).await
    }

    pub async fn update_user_role(&self, user_id: i64, role: Role) -> Result<UserAccount, ApiError> {
        self.put_json(&format!("auth/admin/update-role/{user_id}?role={role}"), &())
            .await
    }

    // ---- regions ----

    pub async fn list_regions(&self) -> Result<Vec<Region>, ApiError> {
        self.get_json("regions/all").await
    }

    pub async fn create_region(&self, request: &RegionSaveRequest) -> Result<Region, ApiError> {
        self.post_json("regions/create", request).await
    }

    pub async fn update_region(&self, id: i64, request: &RegionSaveRequest) -> Result<Region, ApiError> {
        self.put_json(&format!("regions/update/{id}"), request).await
    }

    pub async fn delete_region(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("regions/delete/{id}")).await
    }

    // ---- branches ----

    pub async fn branches_by_region(&self, region_id: i64) -> Result<Vec<Branch>, ApiError> {
        self.get_json(&format!("branches/by-region/{region_id}")).await
    }

    pub async fn create_branch(&self, request: &BranchSaveRequest) -> Result<Branch, ApiError> {
        self.post_json("branches/create", request).await
    }

    pub async fn update_branch(&self, id: i64, request: &BranchSaveRequest) -> Result<Branch, ApiError> {
        self.put_json(&format!("branches/update/{id}"), request).await
    }

    pub async fn delete_branch(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("branches/delete/{id}")).await
    }

    // ---- targets ----

    pub async fn target_by_branch_period(
        &self,
        branch_id: i64,
        year: i32,
        month: u32,
    ) -> Result<Target, ApiError> {
        self.get_json(&format!("targets/branch/{branch_id}/year/{year}/month/{month}"))
            .await
    }

    pub async fn create_target(&self, request: &TargetSaveRequest) -> Result<Target, ApiError> {
        self.post_json("targets/create", request).await
    }

    pub async fn update_target(&self, id: i64, request: &TargetUpdateRequest) -> Result<Target, ApiError> {
        self.put_json(&format!("targets/update/{id}"), request).await
    }

    pub async fn check_existing_targets(&self, year: i32, month: u32) -> Result<ExistingCheck, ApiError> {
        self.get_json(&format!("targets/check-existing/{year}/{month}")).await
    }

    pub async fn upload_targets(
        &self,
        year: i32,
        month: u32,
        file: &web_sys::File,
    ) -> Result<String, ApiError> {
        self.post_file(&format!("targets/upload/{year}/{month}"), file).await
    }

    // ---- collections ----

    pub async fn collection_by_branch_period(
        &self,
        branch_id: i64,
        year: i32,
        month: u32,
    ) -> Result<Collection, ApiError> {
        self.get_json(&format!("collections/record/branch/{branch_id}/year/{year}/month/{month}"))
            .await
    }

    pub async fn create_collection(&self, request: &CollectionSaveRequest) -> Result<Collection, ApiError> {
        self.post_json("collections/create", request).await
    }

    pub async fn update_collection(
        &self,
        id: i64,
        request: &CollectionUpdateRequest,
    ) -> Result<Collection, ApiError> {
        self.put_json(&format!("collections/update/{id}"), request).await
    }

    pub async fn collections_by_region_year(
        &self,
        region_id: i64,
        year: i32,
    ) -> Result<Vec<Collection>, ApiError> {
        self.get_json(&format!("collections/region/{region_id}/year/{year}")).await
    }

    pub async fn collections_by_region_year_month(
        &self,
        region_id: i64,
        year: i32,
        month: u32,
    ) -> Result<Vec<Collection>, ApiError> {
        self.get_json(&format!("collections/region/{region_id}/year/{year}/month/{month}"))
            .await
    }

    pub async fn collections_by_branch_year(
        &self,
        branch_id: i64,
        year: i32,
    ) -> Result<Vec<Collection>, ApiError> {
        self.get_json(&format!("collections/branch/{branch_id}/year/{year}")).await
    }

    pub async fn collections_by_branch_year_month(
        &self,
        branch_id: i64,
        year: i32,
        month: u32,
    ) -> Result<Vec<Collection>, ApiError> {
        self.get_json(&format!("collections/branch/{branch_id}/year/{year}/month/{month}"))
            .await
    }

    pub async fn check_existing_collections(
        &self,
        year: i32,
        month: u32,
    ) -> Result<ExistingCheck, ApiError> {
        self.get_json(&format!("collections/check-existing/{year}/{month}")).await
    }

    pub async fn upload_collections(
        &self,
        year: i32,
        month: u32,
        file: &web_sys::File,
    ) -> Result<String, ApiError> {
        self.post_file(&format!("collections/upload/{year}/{month}"), file).await
    }

    pub async fn upload_update_collections(
        &self,
        year: i32,
        month: u32,
        file: &web_sys::File,
    ) -> Result<String, ApiError> {
        self.post_file(&format!("collections/upload/update/{year}/{month}"), file)
            .await
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}
