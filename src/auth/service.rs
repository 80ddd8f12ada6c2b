//! Administrator Lifecycle
//! Mission: Registration, login, profile and password management for staff accounts

use crate::auth::{
    jwt::JwtHandler,
    models::{
        Admin, AdminRole, AuthContext, ChangePasswordRequest, LoginRequest, LoginResponse,
        RegisterRequest, UpdateProfileRequest,
    },
    password::PasswordHasher,
    permissions::default_permissions,
};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{DocumentId, Page, PageRequest};
use crate::store::{AdminFilter, AdminUpdate, Database};
use crate::validation;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

/// Bootstrap account created (or resynced) at startup.
#[derive(Debug, Clone)]
pub struct DefaultAdmin {
    pub email: String,
    pub password: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&Config> for DefaultAdmin {
    fn from(config: &Config) -> Self {
        Self {
            email: config.admin_email.clone(),
            password: config.admin_password.clone(),
            username: config.admin_username.clone(),
            first_name: config.admin_first_name.clone(),
            last_name: config.admin_last_name.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AdminService {
    db: Database,
    jwt_handler: Arc<JwtHandler>,
    hasher: Arc<PasswordHasher>,
    registration_token: Arc<str>,
}

impl AdminService {
    pub fn new(
        db: Database,
        jwt_handler: Arc<JwtHandler>,
        hasher: Arc<PasswordHasher>,
        registration_token: &str,
    ) -> Self {
        Self {
            db,
            jwt_handler,
            hasher,
            registration_token: Arc::from(registration_token),
        }
    }

    /// Create an administrator. The registration secret is checked before
    /// anything else so a caller without it learns nothing about the payload.
    pub async fn register(&self, req: RegisterRequest) -> Result<Admin, ApiError> {
        if !self.registration_token_matches(&req.registration_token) {
            warn!("⚠️  Admin registration attempted with an invalid registration token");
            return Err(ApiError::forbidden("Invalid registration token"));
        }

        req.validate()?;
        if req.password != req.confirm_password {
            return Err(ApiError::validation("Passwords do not match"));
        }

        let email = normalize_email(&req.email);
        if self
            .db
            .find_admin(AdminFilter::Email(email.clone()))
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(
                "Admin with this email already exists".to_string(),
            ));
        }
        if self
            .db
            .find_admin(AdminFilter::Username(req.username.clone()))
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }

        let password_hash = self.hash_password(req.password).await?;
        let role = req
            .role
            .as_deref()
            .filter(|role| !role.trim().is_empty())
            .map(AdminRole::parse)
            .unwrap_or(AdminRole::Admin);

        let now = Utc::now();
        let admin = Admin {
            id: DocumentId::new(),
            email,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            permissions: default_permissions(&role),
            role,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
            created_by: None,
        };

        // A concurrent registration can still trip the unique indexes; that surfaces as 409.
        let admin = self.db.insert_admin(admin).await?;
        info!("✅ Admin registered: {} ({})", admin.email, admin.role);
        Ok(admin)
    }

    /// Unknown email and wrong password fail identically, in status, body and cost.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, ApiError> {
        let email = normalize_email(&req.email);
        let found = self.db.find_admin(AdminFilter::Email(email)).await?;

        let mut admin = match found {
            Some(admin) => {
                let hasher = Arc::clone(&self.hasher);
                let stored = admin.password_hash.clone();
                let password = req.password;
                let valid =
                    tokio::task::spawn_blocking(move || hasher.verify(&password, &stored)).await?;
                if !valid {
                    warn!("❌ Failed login attempt for admin {}", admin.id);
                    return Err(ApiError::invalid_credentials());
                }
                admin
            }
            None => {
                let hasher = Arc::clone(&self.hasher);
                let password = req.password;
                tokio::task::spawn_blocking(move || hasher.verify_dummy(&password)).await?;
                warn!("❌ Failed login attempt for unknown email");
                return Err(ApiError::invalid_credentials());
            }
        };

        if !admin.is_active {
            warn!("❌ Login refused for deactivated admin {}", admin.id);
            return Err(ApiError::Authentication("Account is deactivated".to_string()));
        }

        let token = self
            .jwt_handler
            .generate_token(&admin)
            .map_err(ApiError::internal)?;

        let now = Utc::now();
        let stamped = self
            .db
            .update_admin(
                AdminFilter::Id(admin.id),
                AdminUpdate {
                    last_login: Some(now),
                    ..Default::default()
                },
            )
            .await;
        if let Err(e) = stamped {
            warn!(error = %e, admin_id = %admin.id, "Failed to record last login");
        }
        admin.last_login = Some(now);

        info!("✅ Login successful: {} ({})", admin.email, admin.role);
        Ok(LoginResponse { token, admin })
    }

    pub async fn profile(&self, actor: &AuthContext) -> Result<Admin, ApiError> {
        self.db
            .find_admin(AdminFilter::Id(actor.admin_id))
            .await?
            .ok_or_else(|| ApiError::not_found("Admin not found"))
    }

    pub async fn update_profile(
        &self,
        actor: &AuthContext,
        req: UpdateProfileRequest,
    ) -> Result<Admin, ApiError> {
        req.validate()?;

        let taken = self
            .db
            .find_admin(AdminFilter::UsernameOtherThan {
                username: req.username.clone(),
                id: actor.admin_id,
            })
            .await?;
        if taken.is_some() {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }

        let matched = self
            .db
            .update_admin(
                AdminFilter::Id(actor.admin_id),
                AdminUpdate {
                    first_name: Some(req.first_name),
                    last_name: Some(req.last_name),
                    username: Some(req.username),
                    ..Default::default()
                },
            )
            .await?;
        if !matched {
            return Err(ApiError::not_found("Admin not found"));
        }

        self.profile(actor).await
    }

    pub async fn change_password(
        &self,
        actor: &AuthContext,
        req: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        if req.current_password.is_empty() {
            return Err(ApiError::invalid_field("current_password", "is required"));
        }
        validation::password("new_password", &req.new_password)?;
        if req.new_password != req.confirm_password {
            return Err(ApiError::validation("New passwords do not match"));
        }

        let admin = self.profile(actor).await?;

        let hasher = Arc::clone(&self.hasher);
        let current = req.current_password;
        let stored = admin.password_hash;
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&current, &stored)).await?;
        if !valid {
            return Err(ApiError::validation("Current password is incorrect"));
        }

        let password_hash = self.hash_password(req.new_password).await?;
        self.db
            .update_admin(
                AdminFilter::Id(actor.admin_id),
                AdminUpdate {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;

        info!("🔐 Password changed for admin {}", actor.admin_id);
        Ok(())
    }

    pub async fn list_admins(&self, request: PageRequest) -> Result<Page<Admin>, ApiError> {
        Ok(self.db.list_admins(request).await?)
    }

    /// Self-deletion is refused before the store is touched.
    pub async fn delete_admin(
        &self,
        actor: &AuthContext,
        target: DocumentId,
    ) -> Result<(), ApiError> {
        if target == actor.admin_id {
            return Err(ApiError::validation("Cannot delete your own account"));
        }

        if !self.db.delete_admin(AdminFilter::Id(target)).await? {
            return Err(ApiError::not_found("Admin not found"));
        }

        info!("🗑️  Admin {} deleted by {}", target, actor.admin_id);
        Ok(())
    }

    /// Make sure the bootstrap account exists and its password matches configuration.
    pub async fn ensure_default_admin(&self, seed: &DefaultAdmin) -> anyhow::Result<Admin> {
        let email = normalize_email(&seed.email);
        let hasher = Arc::clone(&self.hasher);
        let password = seed.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("Password hashing task failed")?
            .context("Failed to hash default admin password")?;

        if let Some(mut existing) = self
            .db
            .find_admin(AdminFilter::Email(email.clone()))
            .await
            .context("Failed to look up default admin")?
        {
            self.db
                .update_admin(
                    AdminFilter::Id(existing.id),
                    AdminUpdate {
                        password_hash: Some(password_hash.clone()),
                        ..Default::default()
                    },
                )
                .await
                .context("Failed to resync default admin password")?;
            existing.password_hash = password_hash;
            info!("🔐 Default admin {} already present, password resynced", email);
            return Ok(existing);
        }

        let now = Utc::now();
        let role = AdminRole::SuperAdmin;
        let admin = Admin {
            id: DocumentId::new(),
            email,
            username: seed.username.clone(),
            first_name: seed.first_name.clone(),
            last_name: seed.last_name.clone(),
            password_hash,
            permissions: default_permissions(&role),
            role,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
            created_by: None,
        };

        let admin = self
            .db
            .insert_admin(admin)
            .await
            .context("Failed to create default admin")?;
        info!("🔐 Default admin created: {}", admin.email);
        Ok(admin)
    }

    fn registration_token_matches(&self, provided: &str) -> bool {
        let expected = self.registration_token.as_bytes();
        !expected.is_empty() && bool::from(provided.as_bytes().ct_eq(expected))
    }

    async fn hash_password(&self, plaintext: String) -> Result<String, ApiError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await?
            .map_err(ApiError::internal)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::temp_db;
    use axum::http::StatusCode;
    use crate::config::MIN_BCRYPT_COST;
    use tempfile::NamedTempFile;

    const REGISTRATION_TOKEN: &str = "let-me-in";

    fn service() -> (AdminService, NamedTempFile) {
        let (db, temp) = temp_db();
        let service = AdminService::new(
            db,
            Arc::new(JwtHandler::new("service-test-secret-0123456789abcdef")),
            Arc::new(PasswordHasher::new(MIN_BCRYPT_COST)),
            REGISTRATION_TOKEN,
        );
        (service, temp)
    }

    fn registration(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            username: username.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "engine42".to_string(),
            confirm_password: "engine42".to_string(),
            registration_token: REGISTRATION_TOKEN.to_string(),
            role: None,
        }
    }

    fn context_for(admin: &Admin) -> AuthContext {
        AuthContext {
            admin_id: admin.id,
            email: admin.email.clone(),
            role: admin.role.clone(),
            permissions: admin.permissions.clone(),
        }
    }

    fn seed() -> DefaultAdmin {
        DefaultAdmin {
            email: "Admin@Ecommerce.com".to_string(),
            password: "admin123".to_string(),
            username: "admin".to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_defaults_to_admin_role() {
        let (service, _temp) = service();
        let admin = service
            .register(registration("ada@shop.example", "ada"))
            .await
            .unwrap();
        assert_eq!(admin.role, AdminRole::Admin);
        assert_eq!(admin.permissions, default_permissions(&AdminRole::Admin));
        assert_ne!(admin.password_hash, "engine42");
        assert!(admin.is_active);
    }

    #[tokio::test]
    async fn test_wrong_registration_token_is_403_regardless_of_payload() {
        let (service, _temp) = service();

        let mut bad = registration("ada@shop.example", "ada");
        bad.registration_token = "guess".to_string();
        let err = service.register(bad).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let garbage = RegisterRequest {
            registration_token: "guess".to_string(),
            ..Default::default()
        };
        let err = service.register(garbage).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        assert_eq!(service.db.count_admins(AdminFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_password_mismatch_rejected_before_write() {
        let (service, _temp) = service();
        let mut req = registration("ada@shop.example", "ada");
        req.confirm_password = "engine43".to_string();

        let err = service.register(req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(service.db.count_admins(AdminFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_or_username_is_409() {
        let (service, _temp) = service();
        service
            .register(registration("ada@shop.example", "ada"))
            .await
            .unwrap();

        let err = service
            .register(registration("ADA@shop.example", "someone"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = service
            .register(registration("other@shop.example", "ada"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _temp) = service();
        service
            .register(registration("ada@shop.example", "ada"))
            .await
            .unwrap();

        let unknown = service
            .login(LoginRequest {
                email: "nobody@shop.example".to_string(),
                password: "engine42".to_string(),
            })
            .await
            .unwrap_err();
        let wrong = service
            .login(LoginRequest {
                email: "ada@shop.example".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), wrong.status());
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_login_issues_token_and_stamps_last_login() {
        let (service, _temp) = service();
        let admin = service
            .register(registration("ada@shop.example", "ada"))
            .await
            .unwrap();

        let response = service
            .login(LoginRequest {
                email: "ada@shop.example".to_string(),
                password: "engine42".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.token.expires_in, 3600);
        assert!(response.admin.last_login.is_some());

        let claims = service
            .jwt_handler
            .validate_token(&response.token.access_token)
            .unwrap();
        assert_eq!(claims.admin_id, admin.id);

        let stored = service.profile(&context_for(&admin)).await.unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn test_deactivated_admin_cannot_login() {
        let (service, _temp) = service();
        let admin = service
            .register(registration("ada@shop.example", "ada"))
            .await
            .unwrap();
        service
            .db
            .update_admin(
                AdminFilter::Id(admin.id),
                AdminUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = service
            .login(LoginRequest {
                email: "ada@shop.example".to_string(),
                password: "engine42".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Account is deactivated");
    }

    #[tokio::test]
    async fn test_change_password() {
        let (service, _temp) = service();
        let admin = service
            .register(registration("ada@shop.example", "ada"))
            .await
            .unwrap();
        let actor = context_for(&admin);

        let wrong_current = service
            .change_password(
                &actor,
                ChangePasswordRequest {
                    current_password: "nope".to_string(),
                    new_password: "analytical".to_string(),
                    confirm_password: "analytical".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(wrong_current.status(), StatusCode::BAD_REQUEST);

        let mismatch = service
            .change_password(
                &actor,
                ChangePasswordRequest {
                    current_password: "engine42".to_string(),
                    new_password: "analytical".to_string(),
                    confirm_password: "analytic".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);

        service
            .change_password(
                &actor,
                ChangePasswordRequest {
                    current_password: "engine42".to_string(),
                    new_password: "analytical".to_string(),
                    confirm_password: "analytical".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(service
            .login(LoginRequest {
                email: "ada@shop.example".to_string(),
                password: "analytical".to_string(),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_username_collision() {
        let (service, _temp) = service();
        let ada = service
            .register(registration("ada@shop.example", "ada"))
            .await
            .unwrap();
        service
            .register(registration("bob@shop.example", "bob"))
            .await
            .unwrap();
        let actor = context_for(&ada);

        let err = service
            .update_profile(
                &actor,
                UpdateProfileRequest {
                    first_name: "Ada".to_string(),
                    last_name: "King".to_string(),
                    username: "bob".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let updated = service
            .update_profile(
                &actor,
                UpdateProfileRequest {
                    first_name: "Ada".to_string(),
                    last_name: "King".to_string(),
                    username: "ada".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.last_name, "King");
        assert_eq!(updated.email, "ada@shop.example");
    }

    #[tokio::test]
    async fn test_self_deletion_refused_without_mutation() {
        let (service, _temp) = service();
        let admin = service
            .register(registration("ada@shop.example", "ada"))
            .await
            .unwrap();
        let actor = context_for(&admin);

        let err = service.delete_admin(&actor, admin.id).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(service.db.count_admins(AdminFilter::All).await.unwrap(), 1);

        let err = service
            .delete_admin(&actor, DocumentId::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_other_admin() {
        let (service, _temp) = service();
        let ada = service
            .register(registration("ada@shop.example", "ada"))
            .await
            .unwrap();
        let bob = service
            .register(registration("bob@shop.example", "bob"))
            .await
            .unwrap();

        service.delete_admin(&context_for(&ada), bob.id).await.unwrap();
        assert_eq!(service.db.count_admins(AdminFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent_and_resyncs_password() {
        let (service, _temp) = service();

        let first = service.ensure_default_admin(&seed()).await.unwrap();
        assert_eq!(first.role, AdminRole::SuperAdmin);
        assert_eq!(first.email, "admin@ecommerce.com");

        let mut rotated = seed();
        rotated.password = "rotated-secret".to_string();
        let second = service.ensure_default_admin(&rotated).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(service.db.count_admins(AdminFilter::All).await.unwrap(), 1);

        assert!(service
            .login(LoginRequest {
                email: "admin@ecommerce.com".to_string(),
                password: "rotated-secret".to_string(),
            })
            .await
            .is_ok());
        assert!(service
            .login(LoginRequest {
                email: "admin@ecommerce.com".to_string(),
                password: "admin123".to_string(),
            })
            .await
            .is_err());
    }
}
