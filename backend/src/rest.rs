use axum::{
    extract::{FromRef, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use shared::{
    BranchSaveRequest, CollectionSaveRequest, CollectionUpdateRequest, LoginRequest,
    RegionSaveRequest, RegisterRequest, Role, TargetSaveRequest, TargetUpdateRequest,
};
use tracing::info;

use crate::auth::{AuthenticatedUser, JwtKeys};
use crate::db::DbConnection;
use crate::domain::{AuthService, BranchService, CollectionService, RegionService, TargetService};
use crate::error::ServiceError;
use crate::excel;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub regions: RegionService,
    pub branches: BranchService,
    pub targets: TargetService,
    pub collections: CollectionService,
    pub jwt_keys: JwtKeys,
}

impl AppState {
    pub fn new(db: DbConnection, jwt_keys: JwtKeys, token_ttl_secs: i64) -> Self {
        Self {
            auth: AuthService::new(db.clone(), jwt_keys.clone(), token_ttl_secs),
            regions: RegionService::new(db.clone()),
            branches: BranchService::new(db.clone()),
            targets: TargetService::new(db.clone()),
            collections: CollectionService::new(db),
            jwt_keys,
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_keys.clone()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/admin/users", get(list_users))
        .route("/auth/admin/create-admin", post(create_admin))
        .route("/auth/admin/delete-user/:id", delete(delete_user))
        .route("/auth/admin/update-role/:id", put(update_role))
        .route("/regions/all", get(list_regions))
        .route("/regions/create", post(create_region))
        .route("/regions/update/:id", put(update_region))
        .route("/regions/delete/:id", delete(delete_region))
        .route("/branches/by-region/:id", get(branches_by_region))
        .route("/branches/create", post(create_branch))
        .route("/branches/update/:id", put(update_branch))
        .route("/branches/delete/:id", delete(delete_branch))
        .route(
            "/targets/branch/:branch_id/year/:year/month/:month",
            get(target_by_branch_period),
        )
        .route("/targets/create", post(create_target))
        .route("/targets/update/:id", put(update_target))
        .route("/targets/check-existing/:year/:month", get(check_targets))
        .route("/targets/upload/:year/:month", post(upload_targets))
        .route(
            "/collections/record/branch/:branch_id/year/:year/month/:month",
            get(collection_by_branch_period),
        )
        .route("/collections/create", post(create_collection))
        .route("/collections/update/:id", put(update_collection))
        .route(
            "/collections/region/:region_id/year/:year",
            get(collections_by_region_year),
        )
        .route(
            "/collections/region/:region_id/year/:year/month/:month",
            get(collections_by_region_month),
        )
        .route(
            "/collections/branch/:branch_id/year/:year",
            get(collections_by_branch_year),
        )
        .route(
            "/collections/branch/:branch_id/year/:year/month/:month",
            get(collections_by_branch_month),
        )
        .route(
            "/collections/check-existing/:year/:month",
            get(check_collections),
        )
        .route("/collections/upload/:year/:month", post(upload_collections))
        .route(
            "/collections/upload/update/:year/:month",
            post(upload_update_collections),
        )
        .with_state(state)
}

/// Branch users may only touch records for the branch named in their
/// token; admins may touch any branch.
fn require_branch_access(user: &AuthenticatedUser, branch_id: i64) -> Result<(), ServiceError> {
    if user.role.is_admin() || user.branch_id == Some(branch_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

// ---------------------------------------------------------------- auth

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    info!(username = %request.username, "login attempt");
    Ok(Json(state.auth.login(request).await?))
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.auth.register(request, Role::User).await?))
}

async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.auth.list_users().await?))
}

async fn create_admin(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.auth.register(request, Role::Admin).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    state.auth.delete_user(&user.username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct RoleQuery {
    role: Role,
}

async fn update_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Query(query): Query<RoleQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(
        state.auth.update_role(&user.username, id, query.role).await?,
    ))
}

// ------------------------------------------------------------- regions

async fn list_regions(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.regions.list().await?))
}

async fn create_region(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<RegionSaveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.regions.create(request).await?))
}

async fn update_region(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<RegionSaveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.regions.update(id, request).await?))
}

async fn delete_region(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    state.regions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ------------------------------------------------------------ branches

async fn branches_by_region(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(region_id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(state.branches.by_region(region_id).await?))
}

async fn create_branch(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<BranchSaveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.branches.create(request).await?))
}

async fn update_branch(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<BranchSaveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.branches.update(id, request).await?))
}

async fn delete_branch(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    state.branches.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ------------------------------------------------------------- targets

async fn target_by_branch_period(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((branch_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state.targets.by_branch_period(branch_id, year, month).await?,
    ))
}

async fn create_target(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<TargetSaveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    require_branch_access(&user, request.branch_id)?;
    Ok(Json(state.targets.create(request).await?))
}

async fn update_target(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<TargetUpdateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.targets.update(id, request).await?))
}

async fn check_targets(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.targets.check_existing(year, month).await?))
}

async fn upload_targets(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((year, month)): Path<(i32, u32)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    let bytes = read_upload(multipart).await?;
    let rows = excel::parse_workbook(&bytes, "targets")?;
    let count = state.targets.import(year, month, &rows).await?;
    Ok(format!("Imported {count} targets"))
}

// --------------------------------------------------------- collections

async fn collection_by_branch_period(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((branch_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .collections
            .by_branch_period(branch_id, year, month)
            .await?,
    ))
}

async fn create_collection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CollectionSaveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    require_branch_access(&user, request.branch_id)?;
    Ok(Json(state.collections.create(request).await?))
}

async fn update_collection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<CollectionUpdateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.collections.update(id, request).await?))
}

async fn collections_by_region_year(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((region_id, year)): Path<(i64, i32)>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state.collections.by_region_year(region_id, year, None).await?,
    ))
}

async fn collections_by_region_month(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((region_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(Json(
        state
            .collections
            .by_region_year(region_id, year, Some(month))
            .await?,
    ))
}

async fn collections_by_branch_year(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((branch_id, year)): Path<(i64, i32)>,
) -> Result<impl IntoResponse, ServiceError> {
    require_branch_access(&user, branch_id)?;
    Ok(Json(
        state.collections.by_branch_year(branch_id, year, None).await?,
    ))
}

async fn collections_by_branch_month(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((branch_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<impl IntoResponse, ServiceError> {
    require_branch_access(&user, branch_id)?;
    Ok(Json(
        state
            .collections
            .by_branch_year(branch_id, year, Some(month))
            .await?,
    ))
}

async fn check_collections(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    Ok(Json(state.collections.check_existing(year, month).await?))
}

async fn upload_collections(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((year, month)): Path<(i32, u32)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    let bytes = read_upload(multipart).await?;
    let rows = excel::parse_workbook(&bytes, "collections")?;
    let count = state.collections.import(year, month, &rows, false).await?;
    Ok(format!("Imported {count} collections"))
}

async fn upload_update_collections(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((year, month)): Path<(i32, u32)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ServiceError> {
    user.require_admin()?;
    let bytes = read_upload(multipart).await?;
    let rows = excel::parse_workbook(&bytes, "collections")?;
    let count = state.collections.import(year, month, &rows, true).await?;
    Ok(format!("Updated {count} collections"))
}

/// Pull the first `file` part out of a multipart upload.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ServiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::Validation(e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServiceError::Validation(e.to_string()))?;
            return Ok(bytes.to_vec());
        }
    }
    Err(ServiceError::Validation(
        "multipart request carried no file".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_access_rules() {
        let admin = AuthenticatedUser {
            username: "admin".to_string(),
            role: Role::Admin,
            branch_id: None,
        };
        assert!(require_branch_access(&admin, 7).is_ok());

        let branch_user = AuthenticatedUser {
            username: "colombo".to_string(),
            role: Role::User,
            branch_id: Some(7),
        };
        assert!(require_branch_access(&branch_user, 7).is_ok());
        assert!(matches!(
            require_branch_access(&branch_user, 8),
            Err(ServiceError::Forbidden)
        ));
    }
}
