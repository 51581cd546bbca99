//! User directory scenarios: creation with duplicate-email rejection,
//! self-service profile updates versus accounting-managed ones, and
//! accounting-gated deletion.

use tripledger_core::domain::user::{NewUser, Role, UserPatch};
use tripledger_core::errors::DomainError;
use tripledger_db::fixtures::{seed_users, SeedUsers};
use tripledger_db::{connect_with_settings, DbPool, ServiceError, UserDirectory};

type TestResult<T = ()> = Result<T, String>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("info").try_init();
}

// Each test gets a uniquely named in-memory database; a plain shared-cache
// `:memory:` URL would be one database for the whole test process.
async fn setup(db_name: &str) -> TestResult<(DbPool, SeedUsers)> {
    init_tracing();
    let url = format!("sqlite:file:{db_name}?mode=memory&cache=shared");
    let pool = connect_with_settings(&url, 1, 30)
        .await
        .map_err(|error| format!("connect test pool: {error}"))?;
    tripledger_db::migrations::run_pending(&pool)
        .await
        .map_err(|error| format!("run migrations: {error}"))?;
    let seeds = seed_users(&pool).await.map_err(|error| format!("seed users: {error}"))?;
    Ok((pool, seeds))
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        name: "Dai Trang".to_string(),
        role: Role::Employee,
        department: Some("Support".to_string()),
    }
}

fn expect_domain(result: Result<impl std::fmt::Debug, ServiceError>) -> TestResult<DomainError> {
    match result {
        Ok(value) => Err(format!("expected a domain error, got Ok({value:?})")),
        Err(ServiceError::Domain(domain)) => Ok(domain),
        Err(other) => Err(format!("expected a domain error, got: {other}")),
    }
}

#[tokio::test]
async fn creation_is_accounting_only_and_rejects_duplicate_emails() -> TestResult {
    let (pool, seeds) = setup("creation_is_accounting_only_and_rejects_duplicate_emails").await?;
    let directory = UserDirectory::new(pool.clone());
    let employee = seeds.employee_actor();
    let accounting = seeds.accounting_actor();

    match expect_domain(directory.create_user(new_user("dai@example.com"), &employee).await)? {
        DomainError::Forbidden(_) => {}
        other => return Err(format!("expected Forbidden, got {other:?}")),
    }

    let created = directory
        .create_user(new_user("dai@example.com"), &accounting)
        .await
        .map_err(|error| format!("create user: {error}"))?;
    if created.email != "dai@example.com" || created.role != Role::Employee {
        return Err(format!("created user mismatch: {created:?}"));
    }

    match expect_domain(directory.create_user(new_user("dai@example.com"), &accounting).await)? {
        DomainError::DuplicateEmail(email) => {
            if email != "dai@example.com" {
                return Err(format!("duplicate error names wrong email: {email}"));
            }
        }
        other => return Err(format!("expected DuplicateEmail, got {other:?}")),
    }

    // Seeded addresses are taken too; the check is against the whole table.
    match expect_domain(directory.create_user(new_user("alice@example.com"), &accounting).await)? {
        DomainError::DuplicateEmail(_) => {}
        other => return Err(format!("expected DuplicateEmail, got {other:?}")),
    }

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn profile_updates_are_self_service_but_roles_are_not() -> TestResult {
    let (pool, seeds) = setup("profile_updates_are_self_service_but_roles_are_not").await?;
    let directory = UserDirectory::new(pool.clone());
    let employee = seeds.employee_actor();
    let accounting = seeds.accounting_actor();

    // An employee edits their own name and department.
    let patch = UserPatch {
        name: Some("Alice N. Tran".to_string()),
        department: Some("Platform".to_string()),
        role: None,
    };
    let updated = directory
        .update_user(&seeds.employee.id, patch, &employee)
        .await
        .map_err(|error| format!("self update: {error}"))?;
    if updated.name != "Alice N. Tran" || updated.department.as_deref() != Some("Platform") {
        return Err(format!("self update not applied: {updated:?}"));
    }
    let fetched = directory
        .get_user(&seeds.employee.id, &employee)
        .await
        .map_err(|error| format!("re-fetch: {error}"))?;
    if fetched.name != "Alice N. Tran" {
        return Err(format!("self update not persisted: {fetched:?}"));
    }

    // But not someone else's record.
    let patch = UserPatch { name: Some("hijacked".to_string()), ..UserPatch::default() };
    match expect_domain(directory.update_user(&seeds.second_employee.id, patch, &employee).await)?
    {
        DomainError::Forbidden(_) => {}
        other => return Err(format!("expected Forbidden, got {other:?}")),
    }

    // And not their own role.
    let patch = UserPatch { role: Some(Role::Accounting), ..UserPatch::default() };
    match expect_domain(directory.update_user(&seeds.employee.id, patch, &employee).await)? {
        DomainError::Forbidden(_) => {}
        other => return Err(format!("expected Forbidden, got {other:?}")),
    }

    // Accounting promotes the employee.
    let patch = UserPatch { role: Some(Role::Accounting), ..UserPatch::default() };
    let promoted = directory
        .update_user(&seeds.employee.id, patch, &accounting)
        .await
        .map_err(|error| format!("promote: {error}"))?;
    if promoted.role != Role::Accounting {
        return Err(format!("promotion not applied: {promoted:?}"));
    }

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn deletion_is_accounting_only() -> TestResult {
    let (pool, seeds) = setup("deletion_is_accounting_only").await?;
    let directory = UserDirectory::new(pool.clone());
    let employee = seeds.employee_actor();
    let accounting = seeds.accounting_actor();

    match expect_domain(directory.delete_user(&seeds.second_employee.id, &employee).await)? {
        DomainError::Forbidden(_) => {}
        other => return Err(format!("expected Forbidden, got {other:?}")),
    }

    let missing = tripledger_core::domain::user::UserId("user-missing".to_string());
    match expect_domain(directory.delete_user(&missing, &accounting).await)? {
        DomainError::NotFound => {}
        other => return Err(format!("expected NotFound, got {other:?}")),
    }

    directory
        .delete_user(&seeds.second_employee.id, &accounting)
        .await
        .map_err(|error| format!("delete user: {error}"))?;
    match expect_domain(directory.get_user(&seeds.second_employee.id, &accounting).await)? {
        DomainError::NotFound => {}
        other => return Err(format!("expected NotFound after delete, got {other:?}")),
    }

    pool.close().await;
    Ok(())
}
