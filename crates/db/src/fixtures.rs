//! Deterministic seed users for integration tests and local development.
//! IDs are fixed so scenarios can reference them directly.

use chrono::Utc;

use tripledger_core::domain::user::{Actor, Role, User, UserId};

use crate::connection::DbPool;
use crate::repositories::{users, RepositoryError};

pub const SEED_EMPLOYEE_ID: &str = "user-employee-001";
pub const SEED_SECOND_EMPLOYEE_ID: &str = "user-employee-002";
pub const SEED_ACCOUNTING_ID: &str = "user-accounting-001";

pub struct SeedUsers {
    pub employee: User,
    pub second_employee: User,
    pub accounting: User,
}

impl SeedUsers {
    pub fn employee_actor(&self) -> Actor {
        Actor { id: self.employee.id.clone(), role: self.employee.role }
    }

    pub fn second_employee_actor(&self) -> Actor {
        Actor { id: self.second_employee.id.clone(), role: self.second_employee.role }
    }

    pub fn accounting_actor(&self) -> Actor {
        Actor { id: self.accounting.id.clone(), role: self.accounting.role }
    }
}

pub async fn seed_users(pool: &DbPool) -> Result<SeedUsers, RepositoryError> {
    let mut tx = pool.begin().await?;

    let employee = seed_user(
        SEED_EMPLOYEE_ID,
        "alice@example.com",
        "Alice Nguyen",
        Role::Employee,
        Some("Engineering"),
    );
    let second_employee = seed_user(
        SEED_SECOND_EMPLOYEE_ID,
        "bob@example.com",
        "Bob Iwu",
        Role::Employee,
        Some("Sales"),
    );
    let accounting = seed_user(
        SEED_ACCOUNTING_ID,
        "carol@example.com",
        "Carol Admin",
        Role::Accounting,
        Some("Finance"),
    );

    users::insert(&mut tx, &employee).await?;
    users::insert(&mut tx, &second_employee).await?;
    users::insert(&mut tx, &accounting).await?;
    tx.commit().await?;

    Ok(SeedUsers { employee, second_employee, accounting })
}

fn seed_user(
    id: &str,
    email: &str,
    name: &str,
    role: Role,
    department: Option<&str>,
) -> User {
    let now = Utc::now();
    User {
        id: UserId(id.to_string()),
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        name: name.to_string(),
        role,
        department: department.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}
