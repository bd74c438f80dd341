//! User directory: accounts, roles and profiles.

use tracing::info;

use crate::auth::{hash_password, verify_password};
use crate::db::{timestamp, DbPool, ProfileUpdate, RegisterRequest, User, UserRole};
use crate::error::{BoardError, BoardResult};

#[derive(Clone)]
pub struct UserDirectory {
    db: DbPool,
}

impl UserDirectory {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn register(&self, request: RegisterRequest) -> BoardResult<User> {
        let email = request.email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(BoardError::conflict("User with this email already exists"));
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| BoardError::Internal(format!("Failed to hash password: {}", e)))?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, phone, role, skills,
                               experience, bio, resume_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(&password_hash)
        .bind(request.full_name.trim())
        .bind(&request.phone)
        .bind(request.role)
        .bind(&request.skills)
        .bind(&request.experience)
        .bind(&request.bio)
        .bind(&request.resume_url)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| match BoardError::from(e) {
            // Lost a race with a concurrent registration
            BoardError::Conflict(_) => BoardError::conflict("User with this email already exists"),
            other => other,
        })?;

        info!(user_id = %id, role = %request.role, "Registered user");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> BoardResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::not_found(format!("User not found with id: {}", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> BoardResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> BoardResult<User> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| BoardError::not_found(format!("User not found with email: {}", email)))
    }

    pub async fn list(&self) -> BoardResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(&self.db)
            .await?;
        Ok(users)
    }

    pub async fn list_by_role(&self, role: UserRole) -> BoardResult<Vec<User>> {
        let users =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = ? ORDER BY created_at ASC")
                .bind(role)
                .fetch_all(&self.db)
                .await?;
        Ok(users)
    }

    pub async fn count(&self) -> BoardResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// Overwrite the profile fields that are present. Role and email stay.
    pub async fn update_profile(&self, id: &str, update: ProfileUpdate) -> BoardResult<User> {
        let mut user = self.get(id).await?;

        if let Some(full_name) = update.full_name {
            if full_name.trim().is_empty() {
                return Err(BoardError::validation("full_name", "Full name cannot be blank"));
            }
            user.full_name = full_name.trim().to_string();
        }
        if update.phone.is_some() {
            user.phone = update.phone;
        }
        if update.skills.is_some() {
            user.skills = update.skills;
        }
        if update.experience.is_some() {
            user.experience = update.experience;
        }
        if update.bio.is_some() {
            user.bio = update.bio;
        }
        if update.resume_url.is_some() {
            user.resume_url = update.resume_url;
        }

        sqlx::query(
            r#"
            UPDATE users SET full_name = ?, phone = ?, skills = ?, experience = ?, bio = ?,
                             resume_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.skills)
        .bind(&user.experience)
        .bind(&user.bio)
        .bind(&user.resume_url)
        .bind(timestamp())
        .bind(id)
        .execute(&self.db)
        .await?;

        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> BoardResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BoardError::not_found(format!("User not found with id: {}", id)));
        }
        info!(user_id = %id, "Deleted user");
        Ok(())
    }

    /// Check credentials. Unknown email and wrong password fail the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> BoardResult<User> {
        let invalid = || BoardError::unauthenticated("Invalid email or password");
        let user = self.find_by_email(email).await?.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash) {
            return Err(invalid());
        }
        Ok(user)
    }

    /// Create the bootstrap administrator if no account uses `email` yet
    pub async fn ensure_admin(&self, email: &str, password: &str) -> BoardResult<()> {
        if self.find_by_email(email).await?.is_some() {
            return Ok(());
        }
        self.register(RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: "Administrator".to_string(),
            role: UserRole::Admin,
            phone: None,
            skills: None,
            experience: None,
            bio: None,
            resume_url: None,
        })
        .await?;
        info!(email = %email, "Created bootstrap admin account");
        Ok(())
    }
}

/// Registration request with everything optional left empty
#[cfg(test)]
pub(crate) fn registration(email: &str, role: UserRole) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "hunter2hunter2".to_string(),
        full_name: email.split('@').next().unwrap_or(email).to_string(),
        role,
        phone: None,
        skills: None,
        experience: None,
        bio: None,
        resume_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn directory() -> UserDirectory {
        UserDirectory::new(db::init_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let users = directory().await;
        let user = users
            .register(registration("Seeker@Example.com", UserRole::JobSeeker))
            .await
            .unwrap();

        assert_eq!(user.email, "seeker@example.com");
        assert_ne!(user.password_hash, "hunter2hunter2");
        assert_eq!(users.get(&user.id).await.unwrap().role, UserRole::JobSeeker);
        assert!(users.find_by_email("seeker@example.com").await.unwrap().is_some());
        assert!(matches!(
            users.get_by_email("nobody@example.com").await,
            Err(BoardError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let users = directory().await;
        users
            .register(registration("dup@example.com", UserRole::Recruiter))
            .await
            .unwrap();
        let err = users
            .register(registration("DUP@example.com", UserRole::JobSeeker))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Conflict(ref m) if m == "User with this email already exists"));
    }

    #[tokio::test]
    async fn test_authenticate() {
        let users = directory().await;
        users
            .register(registration("r@example.com", UserRole::Recruiter))
            .await
            .unwrap();

        assert!(users.authenticate("r@example.com", "hunter2hunter2").await.is_ok());
        let wrong = users.authenticate("r@example.com", "nope").await.unwrap_err();
        let unknown = users.authenticate("x@example.com", "hunter2hunter2").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, BoardError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_unset_fields() {
        let users = directory().await;
        let mut request = registration("p@example.com", UserRole::JobSeeker);
        request.skills = Some("rust".into());
        let user = users.register(request).await.unwrap();

        let updated = users
            .update_profile(
                &user.id,
                ProfileUpdate {
                    bio: Some("Systems programmer".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.skills.as_deref(), Some("rust"));
        assert_eq!(updated.bio.as_deref(), Some("Systems programmer"));
        assert_eq!(updated.role, UserRole::JobSeeker);
    }

    #[tokio::test]
    async fn test_list_by_role_and_delete() {
        let users = directory().await;
        let a = users.register(registration("a@example.com", UserRole::Recruiter)).await.unwrap();
        users.register(registration("b@example.com", UserRole::JobSeeker)).await.unwrap();

        assert_eq!(users.list().await.unwrap().len(), 2);
        assert_eq!(users.list_by_role(UserRole::Recruiter).await.unwrap().len(), 1);

        users.delete(&a.id).await.unwrap();
        assert_eq!(users.count().await.unwrap(), 1);
        assert!(matches!(users.delete(&a.id).await, Err(BoardError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let users = directory().await;
        users.ensure_admin("admin@example.com", "changeme-now").await.unwrap();
        users.ensure_admin("admin@example.com", "changeme-now").await.unwrap();

        let admins = users.list_by_role(UserRole::Admin).await.unwrap();
        assert_eq!(admins.len(), 1);
    }
}
