use chrono::Utc;
use sqlx::MySqlPool;

use crate::authentication::hash_password;
use crate::data_formats::{NewAdmin, Page, Pagination};
use crate::errors::{Error, Result};
use crate::models::{Admin, AdminStatus};

use super::ensure_affected;

const ADMIN_COLUMNS: &str = "id, username, password, nickname, avatar, email, phone, status, \
     last_login, created_at, updated_at, deleted_at";

// ----------------- Admin Lookups -----------------

pub async fn get_admin_by_id(pool: &MySqlPool, id: u64) -> Result<Admin> {
    let query = format!("SELECT {ADMIN_COLUMNS} FROM admin WHERE id = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, Admin>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("admin"))
}

/// Like [`get_admin_by_id`], but also returns soft-deleted rows.
pub async fn get_admin_by_id_with_deleted(pool: &MySqlPool, id: u64) -> Result<Admin> {
    let query = format!("SELECT {ADMIN_COLUMNS} FROM admin WHERE id = ?");
    sqlx::query_as::<_, Admin>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("admin"))
}

pub async fn get_admin_by_username(pool: &MySqlPool, username: &str) -> Result<Admin> {
    let query =
        format!("SELECT {ADMIN_COLUMNS} FROM admin WHERE username = ? AND deleted_at IS NULL");
    sqlx::query_as::<_, Admin>(&query)
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("admin"))
}

/// Non-deleted admins ordered by id, with the total count.
pub async fn list_admins(pool: &MySqlPool, pagination: Pagination) -> Result<Page<Admin>> {
    let mut tx = pool.begin().await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin WHERE deleted_at IS NULL")
        .fetch_one(&mut *tx)
        .await?;

    let query = format!(
        "SELECT {ADMIN_COLUMNS} FROM admin WHERE deleted_at IS NULL ORDER BY id ASC LIMIT ? OFFSET ?"
    );
    let admins = sqlx::query_as::<_, Admin>(&query)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Page::new(admins, total))
}

/// Counts every admin row, soft-deleted ones included.
pub async fn count_admins_with_deleted(pool: &MySqlPool) -> Result<i64> {
    let total = sqlx::query_scalar("SELECT COUNT(*) FROM admin")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

// ----------------- Admin Writes -----------------

/// Hashes the password and inserts the admin. A taken username surfaces as
/// `ConstraintViolation`.
pub async fn create_admin(pool: &MySqlPool, admin: NewAdmin) -> Result<Admin> {
    let NewAdmin {
        username,
        password,
        nickname,
        avatar,
        email,
        phone,
        status,
    } = admin;
    let password = hash_password(password).await?;
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO admin (username, password, nickname, avatar, email, phone, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&username)
    .bind(password)
    .bind(nickname)
    .bind(avatar)
    .bind(email)
    .bind(phone)
    .bind(status)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let id = result.last_insert_id();
    tracing::debug!(id, %username, "admin created");
    get_admin_by_id(pool, id).await
}

/// Saves every column of `admin` by primary key, `deleted_at` included,
/// inserting the row when no admin has that id. Soft-deleted rows are
/// overwritten too, so clearing `deleted_at` restores one. `password` is
/// stored as given.
pub async fn update_admin(pool: &MySqlPool, admin: &Admin) -> Result<Admin> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let existing: Option<u64> =
        sqlx::query_scalar("SELECT id FROM admin WHERE id = ? FOR UPDATE")
            .bind(admin.id)
            .fetch_optional(&mut *tx)
            .await?;

    let id = if existing.is_some() {
        sqlx::query(
            r#"
            UPDATE admin
            SET username = ?, password = ?, nickname = ?, avatar = ?, email = ?, phone = ?,
                status = ?, last_login = ?, updated_at = ?, deleted_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&admin.username)
        .bind(&admin.password)
        .bind(&admin.nickname)
        .bind(&admin.avatar)
        .bind(&admin.email)
        .bind(&admin.phone)
        .bind(admin.status)
        .bind(admin.last_login)
        .bind(now)
        .bind(admin.deleted_at)
        .bind(admin.id)
        .execute(&mut *tx)
        .await?;
        admin.id
    } else {
        // id 0 lets MySQL assign one
        let result = sqlx::query(
            r#"
            INSERT INTO admin (id, username, password, nickname, avatar, email, phone, status,
                               last_login, created_at, updated_at, deleted_at)
            VALUES (NULLIF(?, 0), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(admin.id)
        .bind(&admin.username)
        .bind(&admin.password)
        .bind(&admin.nickname)
        .bind(&admin.avatar)
        .bind(&admin.email)
        .bind(&admin.phone)
        .bind(admin.status)
        .bind(admin.last_login)
        .bind(now)
        .bind(now)
        .bind(admin.deleted_at)
        .execute(&mut *tx)
        .await?;
        result.last_insert_id()
    };

    tx.commit().await?;
    tracing::debug!(id, "admin saved");
    get_admin_by_id_with_deleted(pool, id).await
}

/// Soft delete: stamps `deleted_at`, the row stays in the table.
pub async fn delete_admin(pool: &MySqlPool, id: u64) -> Result<()> {
    let result = sqlx::query("UPDATE admin SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    ensure_affected(result, "admin")?;
    tracing::debug!(id, "admin soft-deleted");
    Ok(())
}

pub async fn update_admin_status(pool: &MySqlPool, id: u64, status: AdminStatus) -> Result<()> {
    let result = sqlx::query(
        "UPDATE admin SET status = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    ensure_affected(result, "admin")
}

/// Hashes `new_password` before storing it.
pub async fn update_admin_password(pool: &MySqlPool, id: u64, new_password: String) -> Result<()> {
    let password = hash_password(new_password).await?;
    let result = sqlx::query(
        "UPDATE admin SET password = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(password)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    ensure_affected(result, "admin")?;
    tracing::debug!(id, "admin password changed");
    Ok(())
}

pub async fn update_last_login(pool: &MySqlPool, id: u64) -> Result<()> {
    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE admin SET last_login = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    ensure_affected(result, "admin")
}
