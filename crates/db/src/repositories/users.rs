use sqlx::{Row, SqliteConnection};

use tripledger_core::domain::user::{Role, User, UserId};

use super::{decode_datetime, RepositoryError};

pub(crate) fn parse_role(s: &str) -> Result<Role, RepositoryError> {
    match s {
        "employee" => Ok(Role::Employee),
        "accounting" => Ok(Role::Accounting),
        other => Err(RepositoryError::Decode(format!("invalid role: `{other}`"))),
    }
}

const SELECT_USER: &str = "SELECT id, email, password_hash, name, role, department,
        created_at, updated_at
 FROM users";

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let password_hash: String =
        row.try_get("password_hash").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role: String = row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department: Option<String> =
        row.try_get("department").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(User {
        id: UserId(id),
        email,
        password_hash,
        name,
        role: parse_role(&role)?,
        department,
        created_at: decode_datetime("created_at", &created_at)?,
        updated_at: decode_datetime("updated_at", &updated_at)?,
    })
}

pub async fn insert(conn: &mut SqliteConnection, user: &User) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, name, role, department,
                            created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id.0)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.role.as_str())
    .bind(&user.department)
    .bind(user.created_at.to_rfc3339())
    .bind(user.updated_at.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: &UserId,
) -> Result<Option<User>, RepositoryError> {
    let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(conn)
        .await?;

    match row {
        Some(ref r) => Ok(Some(row_to_user(r)?)),
        None => Ok(None),
    }
}

pub async fn find_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<User>, RepositoryError> {
    let row = sqlx::query(&format!("{SELECT_USER} WHERE email = ?"))
        .bind(email)
        .fetch_optional(conn)
        .await?;

    match row {
        Some(ref r) => Ok(Some(row_to_user(r)?)),
        None => Ok(None),
    }
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<User>, RepositoryError> {
    let rows: Vec<sqlx::sqlite::SqliteRow> =
        sqlx::query(&format!("{SELECT_USER} ORDER BY created_at ASC")).fetch_all(conn).await?;

    rows.iter().map(row_to_user).collect()
}

pub async fn update(conn: &mut SqliteConnection, user: &User) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "UPDATE users SET name = ?, department = ?, role = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&user.name)
    .bind(&user.department)
    .bind(user.role.as_str())
    .bind(user.updated_at.to_rfc3339())
    .bind(&user.id.0)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete(conn: &mut SqliteConnection, id: &UserId) -> Result<u64, RepositoryError> {
    let result =
        sqlx::query("DELETE FROM users WHERE id = ?").bind(&id.0).execute(conn).await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{connect_with_settings, migrations, DbPool};

    type TestResult<T = ()> = Result<T, String>;

    async fn setup_pool() -> TestResult<DbPool> {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .map_err(|error| format!("connect test pool: {error}"))?;
        migrations::run_pending(&pool).await.map_err(|error| format!("run migrations: {error}"))?;
        Ok(pool)
    }

    fn sample_user(id: &str, email: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId(id.to_string()),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Test User".to_string(),
            role,
            department: Some("Engineering".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn user_rows_round_trip() -> TestResult {
        let pool = setup_pool().await?;
        let mut conn =
            pool.acquire().await.map_err(|error| format!("acquire connection: {error}"))?;

        let user = sample_user("u-1", "one@example.com", Role::Accounting);
        insert(&mut conn, &user).await.map_err(|error| format!("insert: {error}"))?;

        let fetched = find_by_id(&mut conn, &user.id)
            .await
            .map_err(|error| format!("find by id: {error}"))?
            .ok_or_else(|| "user should exist after insert".to_string())?;
        if fetched != user {
            return Err(format!("round trip mismatch: {fetched:?} != {user:?}"));
        }

        let by_email = find_by_email(&mut conn, "one@example.com")
            .await
            .map_err(|error| format!("find by email: {error}"))?;
        if by_email.as_ref().map(|u| &u.id) != Some(&user.id) {
            return Err(format!("email lookup mismatch: {by_email:?}"));
        }

        let mut updated = user.clone();
        updated.name = "Renamed".to_string();
        updated.role = Role::Employee;
        updated.updated_at = Utc::now();
        let affected =
            update(&mut conn, &updated).await.map_err(|error| format!("update: {error}"))?;
        if affected != 1 {
            return Err(format!("expected 1 updated row, got {affected}"));
        }
        let fetched = find_by_id(&mut conn, &user.id)
            .await
            .map_err(|error| format!("re-fetch: {error}"))?
            .ok_or_else(|| "user should still exist".to_string())?;
        if fetched.name != "Renamed" || fetched.role != Role::Employee {
            return Err(format!("update not applied: {fetched:?}"));
        }

        drop(conn);
        pool.close().await;
        Ok(())
    }

    #[tokio::test]
    async fn list_orders_by_creation_time() -> TestResult {
        let pool = setup_pool().await?;
        let mut conn =
            pool.acquire().await.map_err(|error| format!("acquire connection: {error}"))?;

        let mut first = sample_user("u-1", "one@example.com", Role::Employee);
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = sample_user("u-2", "two@example.com", Role::Employee);
        insert(&mut conn, &first).await.map_err(|error| format!("insert first: {error}"))?;
        insert(&mut conn, &second).await.map_err(|error| format!("insert second: {error}"))?;

        let listed = list(&mut conn).await.map_err(|error| format!("list: {error}"))?;
        let ids: Vec<&str> = listed.iter().map(|u| u.id.0.as_str()).collect();
        if ids != vec!["u-1", "u-2"] {
            return Err(format!("unexpected order: {ids:?}"));
        }

        drop(conn);
        pool.close().await;
        Ok(())
    }
}
