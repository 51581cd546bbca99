//! User directory. Accounting manages the directory; ordinary users can
//! read and update their own record, but only accounting changes roles.

use chrono::Utc;
use tracing::info;

use tripledger_core::authz;
use tripledger_core::domain::user::{Actor, NewUser, User, UserId, UserPatch};
use tripledger_core::errors::DomainError;

use crate::connection::DbPool;
use crate::repositories::{users, RepositoryError};
use crate::services::{new_id, ServiceError};

#[derive(Clone)]
pub struct UserDirectory {
    pool: DbPool,
}

impl UserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create_user(
        &self,
        fields: NewUser,
        actor: &Actor,
    ) -> Result<User, ServiceError> {
        if !authz::can_manage_users(actor) {
            return Err(DomainError::Forbidden("only accounting can manage users").into());
        }

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let user = User {
            id: UserId(new_id()),
            email: fields.email,
            password_hash: fields.password_hash,
            name: fields.name,
            role: fields.role,
            department: fields.department,
            created_at: now,
            updated_at: now,
        };
        // The UNIQUE index on email is the authoritative check; it holds
        // under concurrent creates where a read-then-insert would not.
        if let Err(error) = users::insert(&mut tx, &user).await {
            return Err(match error {
                RepositoryError::Database(sqlx::Error::Database(db))
                    if db.is_unique_violation() =>
                {
                    DomainError::DuplicateEmail(user.email).into()
                }
                other => other.into(),
            });
        }
        tx.commit().await?;

        info!(
            event_name = "directory.user_created",
            user_id = %user.id.0,
            role = %user.role.as_str(),
            "user created"
        );
        Ok(user)
    }

    /// A user can always fetch their own record; everything else requires
    /// the accounting role.
    pub async fn get_user(&self, id: &UserId, actor: &Actor) -> Result<User, ServiceError> {
        if *id != actor.id && !authz::can_manage_users(actor) {
            return Err(DomainError::NotFound.into());
        }
        let mut conn = self.pool.acquire().await?;
        let user = users::find_by_id(&mut conn, id).await?.ok_or(DomainError::NotFound)?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::find_by_email(&mut conn, email).await?)
    }

    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<User>, ServiceError> {
        if !authz::can_manage_users(actor) {
            return Err(DomainError::Forbidden("only accounting can manage users").into());
        }
        let mut conn = self.pool.acquire().await?;
        Ok(users::list(&mut conn).await?)
    }

    /// Users edit their own name and department; accounting edits anyone.
    /// Role changes are accounting-only regardless of whose record it is.
    pub async fn update_user(
        &self,
        id: &UserId,
        patch: UserPatch,
        actor: &Actor,
    ) -> Result<User, ServiceError> {
        if *id != actor.id && !authz::can_manage_users(actor) {
            return Err(DomainError::Forbidden("you can only update your own profile").into());
        }
        if patch.role.is_some() && !authz::can_manage_users(actor) {
            return Err(DomainError::Forbidden("only accounting can change roles").into());
        }

        let mut tx = self.pool.begin().await?;
        let mut user = users::find_by_id(&mut tx, id).await?.ok_or(DomainError::NotFound)?;

        if patch.is_empty() {
            return Ok(user);
        }

        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(department) = patch.department {
            user.department = Some(department);
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        user.updated_at = Utc::now();

        let affected = users::update(&mut tx, &user).await?;
        if affected == 0 {
            return Err(DomainError::UpdateFailed.into());
        }
        tx.commit().await?;

        info!(event_name = "directory.user_updated", user_id = %user.id.0, "user updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: &UserId, actor: &Actor) -> Result<(), ServiceError> {
        if !authz::can_manage_users(actor) {
            return Err(DomainError::Forbidden("only accounting can manage users").into());
        }

        let mut tx = self.pool.begin().await?;
        users::find_by_id(&mut tx, id).await?.ok_or(DomainError::NotFound)?;
        let affected = users::delete(&mut tx, id).await?;
        if affected == 0 {
            return Err(DomainError::DeleteFailed.into());
        }
        tx.commit().await?;

        info!(event_name = "directory.user_deleted", user_id = %id.0, "user deleted");
        Ok(())
    }
}
