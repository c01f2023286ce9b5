use shared::{
    Branch, BranchSaveRequest, Collection, CollectionSaveRequest, CollectionUpdateRequest,
    ExistingCheck, LoginRequest, LoginResponse, Region, RegionRef, RegionSaveRequest,
    RegisterRequest, RegisterResponse, Role, Target, TargetSaveRequest, TargetUpdateRequest,
    UserAccount,
};
use sqlx::Row;
use tracing::info;

use crate::auth::{issue_token, JwtKeys};
use crate::db::DbConnection;
use crate::error::ServiceError;
use crate::excel::SheetRow;

const BCRYPT_COST: u32 = 10;

fn validate_period(year: i32, month: u32) -> Result<(), ServiceError> {
    if year <= 0 || !(1..=12).contains(&month) {
        return Err(ServiceError::Validation(format!(
            "invalid period {year}/{month}"
        )));
    }
    Ok(())
}

fn validate_amount(amount: f64) -> Result<(), ServiceError> {
    if amount <= 0.0 {
        return Err(ServiceError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn parse_role(raw: &str) -> Role {
    if raw.eq_ignore_ascii_case("ADMIN") {
        Role::Admin
    } else {
        Role::User
    }
}

// ---------------------------------------------------------------- auth

#[derive(Clone)]
pub struct AuthService {
    db: DbConnection,
    keys: JwtKeys,
    token_ttl_secs: i64,
}

impl AuthService {
    pub fn new(db: DbConnection, keys: JwtKeys, token_ttl_secs: i64) -> Self {
        Self {
            db,
            keys,
            token_ttl_secs,
        }
    }

    /// Authenticate and issue a token. Bad credentials are reported in the
    /// response body, not as an HTTP error, so the login form can show
    /// them inline.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let row = sqlx::query(
            "SELECT username, password_hash, role FROM users WHERE username = ?",
        )
        .bind(&request.username)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(LoginResponse {
                token: None,
                message: None,
                error: Some("Invalid username or password".to_string()),
            });
        };

        let hash: String = row.get("password_hash");
        let verified = bcrypt::verify(&request.password, &hash)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        if !verified {
            return Ok(LoginResponse {
                token: None,
                message: None,
                error: Some("Invalid username or password".to_string()),
            });
        }

        let username: String = row.get("username");
        let role = parse_role(row.get("role"));

        // Branch users are named after their branch; the claims carry the
        // resolved branch so the client never has to look it up.
        let branch = if role.is_admin() {
            None
        } else {
            sqlx::query("SELECT id, name FROM branches WHERE UPPER(name) = UPPER(?)")
                .bind(&username)
                .fetch_optional(self.db.pool())
                .await?
                .map(|b| (b.get::<i64, _>("id"), b.get::<String, _>("name")))
        };

        let token = issue_token(&self.keys, self.token_ttl_secs, &username, role, branch)?;
        info!(username, "login succeeded");
        Ok(LoginResponse {
            token: Some(token),
            message: Some("Login successful".to_string()),
            error: None,
        })
    }

    pub async fn register(
        &self,
        request: RegisterRequest,
        role: Role,
    ) -> Result<RegisterResponse, ServiceError> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(ServiceError::Validation("username is required".to_string()));
        }
        if request.password.len() < 6 {
            return Err(ServiceError::Validation(
                "password must be at least 6 characters".to_string(),
            ));
        }

        let existing = sqlx::query("SELECT id FROM users WHERE username = ?")
            .bind(&username)
            .fetch_optional(self.db.pool())
            .await?;
        if existing.is_some() {
            return Ok(RegisterResponse {
                message: None,
                error: Some(format!("Username {username} is already taken")),
            });
        }

        let hash = bcrypt::hash(&request.password, BCRYPT_COST)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        sqlx::query(
            "INSERT INTO users (name, email, username, password_hash, role) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&username)
        .bind(&hash)
        .bind(role.to_string())
        .execute(self.db.pool())
        .await?;

        info!(username, %role, "account created");
        Ok(RegisterResponse {
            message: Some(format!("Account {username} created")),
            error: None,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<UserAccount>, ServiceError> {
        let rows = sqlx::query("SELECT id, name, email, username, role FROM users ORDER BY username")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(Self::map_user).collect())
    }

    /// Change a user's role. The acting admin may never change their own.
    pub async fn update_role(
        &self,
        acting_username: &str,
        user_id: i64,
        role: Role,
    ) -> Result<UserAccount, ServiceError> {
        let row = sqlx::query("SELECT id, name, email, username, role FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound)?;

        let target_username: String = row.get("username");
        if target_username == acting_username {
            return Err(ServiceError::Forbidden);
        }

        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.to_string())
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        let updated = sqlx::query("SELECT id, name, email, username, role FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(Self::map_user(&updated))
    }

    /// Delete an account; self-deletion is refused.
    pub async fn delete_user(
        &self,
        acting_username: &str,
        user_id: i64,
    ) -> Result<(), ServiceError> {
        let row = sqlx::query("SELECT username FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound)?;

        let target_username: String = row.get("username");
        if target_username == acting_username {
            return Err(ServiceError::Forbidden);
        }

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Create a default administrator on first start so the console is
    /// reachable on an empty database.
    pub async fn seed_admin_if_empty(&self) -> Result<(), ServiceError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(self.db.pool())
            .await?
            .get("n");
        if count > 0 {
            return Ok(());
        }
        let response = self
            .register(
                RegisterRequest {
                    name: "Administrator".to_string(),
                    email: "admin@localhost".to_string(),
                    username: "admin".to_string(),
                    password: "admin123".to_string(),
                },
                Role::Admin,
            )
            .await?;
        if response.error.is_none() {
            info!("seeded default admin account; change its password");
        }
        Ok(())
    }

    fn map_user(row: &sqlx::sqlite::SqliteRow) -> UserAccount {
        UserAccount {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            username: row.get("username"),
            role: parse_role(row.get("role")),
        }
    }
}

// ------------------------------------------------------------- regions

#[derive(Clone)]
pub struct RegionService {
    db: DbConnection,
}

impl RegionService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Region>, ServiceError> {
        let rows = sqlx::query("SELECT id, name, description FROM regions ORDER BY name")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .iter()
            .map(|row| Region {
                id: row.get("id"),
                name: row.get("name"),
                description: row.get("description"),
            })
            .collect())
    }

    pub async fn create(&self, request: RegionSaveRequest) -> Result<Region, ServiceError> {
        if request.name.trim().is_empty() {
            return Err(ServiceError::Validation("region name is required".to_string()));
        }
        let result = sqlx::query("INSERT INTO regions (name, description) VALUES (?, ?)")
            .bind(request.name.trim())
            .bind(&request.description)
            .execute(self.db.pool())
            .await?;
        self.by_id(result.last_insert_rowid()).await
    }

    pub async fn update(&self, id: i64, request: RegionSaveRequest) -> Result<Region, ServiceError> {
        let result = sqlx::query("UPDATE regions SET name = ?, description = ? WHERE id = ?")
            .bind(request.name.trim())
            .bind(&request.description)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }
        self.by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM regions WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    async fn by_id(&self, id: i64) -> Result<Region, ServiceError> {
        let row = sqlx::query("SELECT id, name, description FROM regions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound)?;
        Ok(Region {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
        })
    }
}

// ------------------------------------------------------------ branches

#[derive(Clone)]
pub struct BranchService {
    db: DbConnection,
}

impl BranchService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn by_region(&self, region_id: i64) -> Result<Vec<Branch>, ServiceError> {
        let rows = sqlx::query(
            "SELECT b.id, b.name, b.description, r.id AS region_id, r.name AS region_name \
             FROM branches b JOIN regions r ON r.id = b.region_id \
             WHERE b.region_id = ? ORDER BY b.name",
        )
        .bind(region_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows.iter().map(Self::map_branch).collect())
    }

    pub async fn create(&self, request: BranchSaveRequest) -> Result<Branch, ServiceError> {
        if request.name.trim().is_empty() {
            return Err(ServiceError::Validation("branch name is required".to_string()));
        }
        let region = sqlx::query("SELECT id FROM regions WHERE id = ?")
            .bind(request.region_id)
            .fetch_optional(self.db.pool())
            .await?;
        if region.is_none() {
            return Err(ServiceError::Validation(format!(
                "region {} does not exist",
                request.region_id
            )));
        }

        let result =
            sqlx::query("INSERT INTO branches (name, description, region_id) VALUES (?, ?, ?)")
                .bind(request.name.trim().to_uppercase())
                .bind(&request.description)
                .bind(request.region_id)
                .execute(self.db.pool())
                .await?;
        self.by_id(result.last_insert_rowid()).await
    }

    pub async fn update(&self, id: i64, request: BranchSaveRequest) -> Result<Branch, ServiceError> {
        let result =
            sqlx::query("UPDATE branches SET name = ?, description = ?, region_id = ? WHERE id = ?")
                .bind(request.name.trim().to_uppercase())
                .bind(&request.description)
                .bind(request.region_id)
                .bind(id)
                .execute(self.db.pool())
                .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }
        self.by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM branches WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    }

    async fn by_id(&self, id: i64) -> Result<Branch, ServiceError> {
        let row = sqlx::query(
            "SELECT b.id, b.name, b.description, r.id AS region_id, r.name AS region_name \
             FROM branches b JOIN regions r ON r.id = b.region_id WHERE b.id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(ServiceError::NotFound)?;
        Ok(Self::map_branch(&row))
    }

    async fn id_by_name(&self, name: &str) -> Result<Option<i64>, ServiceError> {
        let row = sqlx::query("SELECT id FROM branches WHERE UPPER(name) = UPPER(?)")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|r| r.get("id")))
    }

    fn map_branch(row: &sqlx::sqlite::SqliteRow) -> Branch {
        Branch {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            region: RegionRef {
                id: row.get("region_id"),
                name: row.get("region_name"),
            },
        }
    }
}

// ------------------------------------------------------------- targets

#[derive(Clone)]
pub struct TargetService {
    db: DbConnection,
    branches: BranchService,
}

impl TargetService {
    pub fn new(db: DbConnection) -> Self {
        let branches = BranchService::new(db.clone());
        Self { db, branches }
    }

    pub async fn by_branch_period(
        &self,
        branch_id: i64,
        year: i32,
        month: u32,
    ) -> Result<Target, ServiceError> {
        let row = sqlx::query(
            "SELECT id, branch_id, year, month, amount FROM targets \
             WHERE branch_id = ? AND year = ? AND month = ?",
        )
        .bind(branch_id)
        .bind(year)
        .bind(month as i64)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(ServiceError::NotFound)?;
        Ok(Self::map_target(&row))
    }

    /// One target per (branch, year, month); a second create conflicts.
    pub async fn create(&self, request: TargetSaveRequest) -> Result<Target, ServiceError> {
        validate_period(request.year, request.month)?;
        validate_amount(request.amount)?;

        let result = sqlx::query(
            "INSERT INTO targets (branch_id, year, month, amount) VALUES (?, ?, ?, ?)",
        )
        .bind(request.branch_id)
        .bind(request.year)
        .bind(request.month as i64)
        .bind(request.amount)
        .execute(self.db.pool())
        .await?;

        let row = sqlx::query("SELECT id, branch_id, year, month, amount FROM targets WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(self.db.pool())
            .await?;
        Ok(Self::map_target(&row))
    }

    pub async fn update(&self, id: i64, request: TargetUpdateRequest) -> Result<Target, ServiceError> {
        validate_amount(request.amount)?;
        let result = sqlx::query("UPDATE targets SET amount = ? WHERE id = ?")
            .bind(request.amount)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }
        let row = sqlx::query("SELECT id, branch_id, year, month, amount FROM targets WHERE id = ?")
            .bind(id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(Self::map_target(&row))
    }

    pub async fn check_existing(&self, year: i32, month: u32) -> Result<ExistingCheck, ServiceError> {
        let count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM targets WHERE year = ? AND month = ?")
                .bind(year)
                .bind(month as i64)
                .fetch_one(self.db.pool())
                .await?
                .get("n");
        Ok(ExistingCheck {
            exists: count > 0,
            count,
        })
    }

    /// Bulk import for one period, overwriting any existing amount per
    /// branch. Unknown branch names fail the whole upload.
    pub async fn import(
        &self,
        year: i32,
        month: u32,
        rows: &[SheetRow],
    ) -> Result<usize, ServiceError> {
        validate_period(year, month)?;
        for row in rows {
            let branch_id = self
                .branches
                .id_by_name(&row.branch_name)
                .await?
                .ok_or_else(|| {
                    ServiceError::Validation(format!("unknown branch {}", row.branch_name))
                })?;
            sqlx::query(
                "INSERT INTO targets (branch_id, year, month, amount) VALUES (?, ?, ?, ?) \
                 ON CONFLICT(branch_id, year, month) DO UPDATE SET amount = excluded.amount",
            )
            .bind(branch_id)
            .bind(year)
            .bind(month as i64)
            .bind(row.amount)
            .execute(self.db.pool())
            .await?;
        }
        info!(year, month, count = rows.len(), "imported targets");
        Ok(rows.len())
    }

    fn map_target(row: &sqlx::sqlite::SqliteRow) -> Target {
        Target {
            id: row.get("id"),
            branch_id: row.get("branch_id"),
            year: row.get("year"),
            month: row.get::<i64, _>("month") as u32,
            amount: row.get("amount"),
        }
    }
}

// --------------------------------------------------------- collections

#[derive(Clone)]
pub struct CollectionService {
    db: DbConnection,
    branches: BranchService,
}

const COLLECTION_SELECT: &str =
    "SELECT c.id, c.branch_id, b.name AS branch_name, r.name AS region_name, \
            c.year, c.month, c.amount, COALESCE(t.amount, 0) AS target \
     FROM collections c \
     JOIN branches b ON b.id = c.branch_id \
     JOIN regions r ON r.id = b.region_id \
     LEFT JOIN targets t ON t.branch_id = c.branch_id AND t.year = c.year AND t.month = c.month";

impl CollectionService {
    pub fn new(db: DbConnection) -> Self {
        let branches = BranchService::new(db.clone());
        Self { db, branches }
    }

    pub async fn by_branch_period(
        &self,
        branch_id: i64,
        year: i32,
        month: u32,
    ) -> Result<Collection, ServiceError> {
        let sql = format!("{COLLECTION_SELECT} WHERE c.branch_id = ? AND c.year = ? AND c.month = ?");
        let row = sqlx::query(&sql)
            .bind(branch_id)
            .bind(year)
            .bind(month as i64)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound)?;
        Ok(Self::map_collection(&row))
    }

    /// A collection can only be recorded against an existing target for
    /// the same period.
    pub async fn create(&self, request: CollectionSaveRequest) -> Result<Collection, ServiceError> {
        validate_period(request.year, request.month)?;
        validate_amount(request.amount)?;
        self.require_target(request.branch_id, request.year, request.month)
            .await?;

        sqlx::query("INSERT INTO collections (branch_id, year, month, amount) VALUES (?, ?, ?, ?)")
            .bind(request.branch_id)
            .bind(request.year)
            .bind(request.month as i64)
            .bind(request.amount)
            .execute(self.db.pool())
            .await?;

        self.by_branch_period(request.branch_id, request.year, request.month)
            .await
    }

    pub async fn update(
        &self,
        id: i64,
        request: CollectionUpdateRequest,
    ) -> Result<Collection, ServiceError> {
        validate_amount(request.amount)?;
        let result = sqlx::query("UPDATE collections SET amount = ? WHERE id = ?")
            .bind(request.amount)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound);
        }

        let sql = format!("{COLLECTION_SELECT} WHERE c.id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(Self::map_collection(&row))
    }

    pub async fn by_region_year(
        &self,
        region_id: i64,
        year: i32,
        month: Option<u32>,
    ) -> Result<Vec<Collection>, ServiceError> {
        let rows = match month {
            Some(month) => {
                let sql = format!(
                    "{COLLECTION_SELECT} WHERE r.id = ? AND c.year = ? AND c.month = ? \
                     ORDER BY b.name, c.month"
                );
                sqlx::query(&sql)
                    .bind(region_id)
                    .bind(year)
                    .bind(month as i64)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "{COLLECTION_SELECT} WHERE r.id = ? AND c.year = ? ORDER BY b.name, c.month"
                );
                sqlx::query(&sql)
                    .bind(region_id)
                    .bind(year)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };
        Ok(rows.iter().map(Self::map_collection).collect())
    }

    pub async fn by_branch_year(
        &self,
        branch_id: i64,
        year: i32,
        month: Option<u32>,
    ) -> Result<Vec<Collection>, ServiceError> {
        let rows = match month {
            Some(month) => {
                let sql = format!(
                    "{COLLECTION_SELECT} WHERE c.branch_id = ? AND c.year = ? AND c.month = ? \
                     ORDER BY c.month"
                );
                sqlx::query(&sql)
                    .bind(branch_id)
                    .bind(year)
                    .bind(month as i64)
                    .fetch_all(self.db.pool())
                    .await?
            }
            None => {
                let sql = format!(
                    "{COLLECTION_SELECT} WHERE c.branch_id = ? AND c.year = ? ORDER BY c.month"
                );
                sqlx::query(&sql)
                    .bind(branch_id)
                    .bind(year)
                    .fetch_all(self.db.pool())
                    .await?
            }
        };
        Ok(rows.iter().map(Self::map_collection).collect())
    }

    pub async fn check_existing(&self, year: i32, month: u32) -> Result<ExistingCheck, ServiceError> {
        let count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM collections WHERE year = ? AND month = ?")
                .bind(year)
                .bind(month as i64)
                .fetch_one(self.db.pool())
                .await?
                .get("n");
        Ok(ExistingCheck {
            exists: count > 0,
            count,
        })
    }

    /// Bulk import for one period. Every row needs a backing target; with
    /// `overwrite` false an existing collection for a branch conflicts.
    pub async fn import(
        &self,
        year: i32,
        month: u32,
        rows: &[SheetRow],
        overwrite: bool,
    ) -> Result<usize, ServiceError> {
        validate_period(year, month)?;
        for row in rows {
            let branch_id = self
                .branches
                .id_by_name(&row.branch_name)
                .await?
                .ok_or_else(|| {
                    ServiceError::Validation(format!("unknown branch {}", row.branch_name))
                })?;
            self.require_target(branch_id, year, month).await?;

            if overwrite {
                sqlx::query(
                    "INSERT INTO collections (branch_id, year, month, amount) VALUES (?, ?, ?, ?) \
                     ON CONFLICT(branch_id, year, month) DO UPDATE SET amount = excluded.amount",
                )
                .bind(branch_id)
                .bind(year)
                .bind(month as i64)
                .bind(row.amount)
                .execute(self.db.pool())
                .await?;
            } else {
                sqlx::query(
                    "INSERT INTO collections (branch_id, year, month, amount) VALUES (?, ?, ?, ?)",
                )
                .bind(branch_id)
                .bind(year)
                .bind(month as i64)
                .bind(row.amount)
                .execute(self.db.pool())
                .await?;
            }
        }
        info!(year, month, count = rows.len(), overwrite, "imported collections");
        Ok(rows.len())
    }

    async fn require_target(
        &self,
        branch_id: i64,
        year: i32,
        month: u32,
    ) -> Result<(), ServiceError> {
        let target =
            sqlx::query("SELECT id FROM targets WHERE branch_id = ? AND year = ? AND month = ?")
                .bind(branch_id)
                .bind(year)
                .bind(month as i64)
                .fetch_optional(self.db.pool())
                .await?;
        if target.is_none() {
            return Err(ServiceError::Validation(format!(
                "no target exists for branch {branch_id} in {year}/{month}; set the target first"
            )));
        }
        Ok(())
    }

    /// Due and achievement are derived on every read from the current
    /// target, never stored.
    fn map_collection(row: &sqlx::sqlite::SqliteRow) -> Collection {
        let target: f64 = row.get("target");
        let amount: f64 = row.get("amount");
        let percentage = if target <= 0.0 {
            0.0
        } else {
            (amount / target * 100.0).round()
        };
        Collection {
            id: row.get("id"),
            branch_id: row.get("branch_id"),
            branch_name: row.get("branch_name"),
            region_name: row.get("region_name"),
            year: row.get("year"),
            month: row.get::<i64, _>("month") as u32,
            target,
            amount,
            due: target - amount,
            percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (DbConnection, RegionService, BranchService, TargetService, CollectionService)
    {
        let db = DbConnection::init_test().await.expect("test db");
        (
            db.clone(),
            RegionService::new(db.clone()),
            BranchService::new(db.clone()),
            TargetService::new(db.clone()),
            CollectionService::new(db),
        )
    }

    async fn seed_branch(regions: &RegionService, branches: &BranchService) -> Branch {
        let region = regions
            .create(RegionSaveRequest {
                name: "WESTERN".to_string(),
                description: "Western province".to_string(),
            })
            .await
            .unwrap();
        branches
            .create(BranchSaveRequest {
                name: "Colombo".to_string(),
                description: String::new(),
                region_id: region.id,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn region_crud_round_trip() {
        let (_, regions, _, _, _) = setup().await;

        let created = regions
            .create(RegionSaveRequest {
                name: "SOUTHERN".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        assert_eq!(created.name, "SOUTHERN");

        let updated = regions
            .update(
                created.id,
                RegionSaveRequest {
                    name: "SOUTHERN".to_string(),
                    description: "Southern province".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "Southern province");

        regions.delete(created.id).await.unwrap();
        assert!(regions.list().await.unwrap().is_empty());
        assert!(matches!(
            regions.delete(created.id).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn branch_names_are_stored_uppercase() {
        let (_, regions, branches, _, _) = setup().await;
        let branch = seed_branch(&regions, &branches).await;
        assert_eq!(branch.name, "COLOMBO");
        assert_eq!(branch.region.name, "WESTERN");
    }

    #[tokio::test]
    async fn second_target_for_same_period_conflicts() {
        let (_, regions, branches, targets, _) = setup().await;
        let branch = seed_branch(&regions, &branches).await;

        targets
            .create(TargetSaveRequest {
                branch_id: branch.id,
                year: 2025,
                month: 6,
                amount: 1000.0,
            })
            .await
            .unwrap();

        let duplicate = targets
            .create(TargetSaveRequest {
                branch_id: branch.id,
                year: 2025,
                month: 6,
                amount: 500.0,
            })
            .await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let (_, regions, branches, targets, _) = setup().await;
        let branch = seed_branch(&regions, &branches).await;
        let result = targets.by_branch_period(branch.id, 2025, 6).await;
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[tokio::test]
    async fn collection_requires_a_backing_target() {
        let (_, regions, branches, targets, collections) = setup().await;
        let branch = seed_branch(&regions, &branches).await;

        let refused = collections
            .create(CollectionSaveRequest {
                branch_id: branch.id,
                year: 2025,
                month: 6,
                amount: 800.0,
            })
            .await;
        assert!(matches!(refused, Err(ServiceError::Validation(_))));

        targets
            .create(TargetSaveRequest {
                branch_id: branch.id,
                year: 2025,
                month: 6,
                amount: 1000.0,
            })
            .await
            .unwrap();

        let created = collections
            .create(CollectionSaveRequest {
                branch_id: branch.id,
                year: 2025,
                month: 6,
                amount: 800.0,
            })
            .await
            .unwrap();
        assert_eq!(created.target, 1000.0);
        assert_eq!(created.due, 200.0);
        assert_eq!(created.percentage, 80.0);
        assert_eq!(created.branch_name, "COLOMBO");
        assert_eq!(created.region_name, "WESTERN");
    }

    #[tokio::test]
    async fn collection_update_recomputes_due_from_current_target() {
        let (_, regions, branches, targets, collections) = setup().await;
        let branch = seed_branch(&regions, &branches).await;

        let target = targets
            .create(TargetSaveRequest {
                branch_id: branch.id,
                year: 2025,
                month: 6,
                amount: 1000.0,
            })
            .await
            .unwrap();
        let collection = collections
            .create(CollectionSaveRequest {
                branch_id: branch.id,
                year: 2025,
                month: 6,
                amount: 600.0,
            })
            .await
            .unwrap();

        // Raise the target, then update the collection; due must reflect
        // the new target.
        targets
            .update(target.id, TargetUpdateRequest { amount: 2000.0 })
            .await
            .unwrap();
        let updated = collections
            .update(
                collection.id,
                CollectionUpdateRequest {
                    target: 2000.0,
                    due: 1100.0,
                    amount: 900.0,
                    year: 2025,
                    month: 6,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.amount, 900.0);
        assert_eq!(updated.target, 2000.0);
        assert_eq!(updated.due, 1100.0);
        assert_eq!(updated.percentage, 45.0);
    }

    #[tokio::test]
    async fn region_and_branch_listings_filter_by_period() {
        let (_, regions, branches, targets, collections) = setup().await;
        let branch = seed_branch(&regions, &branches).await;

        for month in [1u32, 2] {
            targets
                .create(TargetSaveRequest {
                    branch_id: branch.id,
                    year: 2025,
                    month,
                    amount: 100.0,
                })
                .await
                .unwrap();
            collections
                .create(CollectionSaveRequest {
                    branch_id: branch.id,
                    year: 2025,
                    month,
                    amount: 50.0,
                })
                .await
                .unwrap();
        }

        let year_rows = collections
            .by_region_year(branch.region.id, 2025, None)
            .await
            .unwrap();
        assert_eq!(year_rows.len(), 2);

        let month_rows = collections
            .by_branch_year(branch.id, 2025, Some(2))
            .await
            .unwrap();
        assert_eq!(month_rows.len(), 1);
        assert_eq!(month_rows[0].month, 2);

        let other_year = collections
            .by_branch_year(branch.id, 2024, None)
            .await
            .unwrap();
        assert!(other_year.is_empty());
    }

    #[tokio::test]
    async fn check_existing_counts_records_for_the_period() {
        let (_, regions, branches, targets, _) = setup().await;
        let branch = seed_branch(&regions, &branches).await;

        let empty = targets.check_existing(2025, 6).await.unwrap();
        assert!(!empty.exists);
        assert_eq!(empty.count, 0);

        targets
            .create(TargetSaveRequest {
                branch_id: branch.id,
                year: 2025,
                month: 6,
                amount: 100.0,
            })
            .await
            .unwrap();

        let found = targets.check_existing(2025, 6).await.unwrap();
        assert!(found.exists);
        assert_eq!(found.count, 1);
    }

    #[tokio::test]
    async fn target_import_upserts_and_rejects_unknown_branches() {
        let (_, regions, branches, targets, _) = setup().await;
        let branch = seed_branch(&regions, &branches).await;

        let rows = vec![SheetRow {
            branch_name: "COLOMBO".to_string(),
            amount: 1000.0,
        }];
        assert_eq!(targets.import(2025, 6, &rows).await.unwrap(), 1);

        // Re-import replaces the amount.
        let rows = vec![SheetRow {
            branch_name: "COLOMBO".to_string(),
            amount: 1500.0,
        }];
        targets.import(2025, 6, &rows).await.unwrap();
        let stored = targets.by_branch_period(branch.id, 2025, 6).await.unwrap();
        assert_eq!(stored.amount, 1500.0);

        let unknown = vec![SheetRow {
            branch_name: "NOWHERE".to_string(),
            amount: 10.0,
        }];
        assert!(matches!(
            targets.import(2025, 6, &unknown).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn collection_import_needs_targets_and_honors_overwrite() {
        let (_, regions, branches, targets, collections) = setup().await;
        seed_branch(&regions, &branches).await;

        let rows = vec![SheetRow {
            branch_name: "COLOMBO".to_string(),
            amount: 800.0,
        }];

        // No targets yet.
        assert!(matches!(
            collections.import(2025, 6, &rows, false).await,
            Err(ServiceError::Validation(_))
        ));

        targets
            .import(
                2025,
                6,
                &[SheetRow {
                    branch_name: "COLOMBO".to_string(),
                    amount: 1000.0,
                }],
            )
            .await
            .unwrap();

        collections.import(2025, 6, &rows, false).await.unwrap();

        // A second plain import conflicts; the overwrite variant succeeds.
        assert!(matches!(
            collections.import(2025, 6, &rows, false).await,
            Err(ServiceError::Conflict(_))
        ));
        collections.import(2025, 6, &rows, true).await.unwrap();
    }

    #[tokio::test]
    async fn login_issues_branch_claims_for_branch_users() {
        let (db, regions, branches, _, _) = setup().await;
        let branch = seed_branch(&regions, &branches).await;
        let auth = AuthService::new(db, JwtKeys::new("test-secret"), 3600);

        auth.register(
            RegisterRequest {
                name: "Colombo Branch".to_string(),
                email: "colombo@example.com".to_string(),
                username: "colombo".to_string(),
                password: "secret123".to_string(),
            },
            Role::User,
        )
        .await
        .unwrap();

        let response = auth
            .login(LoginRequest {
                username: "colombo".to_string(),
                password: "secret123".to_string(),
            })
            .await
            .unwrap();
        let token = response.token.expect("token issued");

        let decoded = jsonwebtoken::decode::<crate::auth::Claims>(
            &token,
            &JwtKeys::new("test-secret").decoding,
            &jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.branch_id, Some(branch.id));
        assert_eq!(decoded.claims.branch_name.as_deref(), Some("COLOMBO"));

        let bad = auth
            .login(LoginRequest {
                username: "colombo".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap();
        assert!(bad.token.is_none());
        assert!(bad.error.is_some());
    }

    #[tokio::test]
    async fn admins_cannot_modify_their_own_account() {
        let (db, _, _, _, _) = setup().await;
        let auth = AuthService::new(db, JwtKeys::new("test-secret"), 3600);
        auth.seed_admin_if_empty().await.unwrap();

        let users = auth.list_users().await.unwrap();
        let admin = users.iter().find(|u| u.username == "admin").unwrap();

        assert!(matches!(
            auth.update_role("admin", admin.id, Role::User).await,
            Err(ServiceError::Forbidden)
        ));
        assert!(matches!(
            auth.delete_user("admin", admin.id).await,
            Err(ServiceError::Forbidden)
        ));

        // Another admin may.
        auth.register(
            RegisterRequest {
                name: "Second".to_string(),
                email: "second@example.com".to_string(),
                username: "second".to_string(),
                password: "secret123".to_string(),
            },
            Role::Admin,
        )
        .await
        .unwrap();
        let users = auth.list_users().await.unwrap();
        let second = users.iter().find(|u| u.username == "second").unwrap();
        let updated = auth.update_role("admin", second.id, Role::User).await.unwrap();
        assert_eq!(updated.role, Role::User);
        auth.delete_user("admin", second.id).await.unwrap();
    }
}
