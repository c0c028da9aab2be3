//! PostgreSQL backend.

use certis_core::{CertificateId, CertificateRecord};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{AdminIdentity, CertificatePage, ListQuery, StoreError};

/// Row type for certificate queries.
#[derive(FromRow)]
struct CertificateRow {
    certificate_id: String,
    name: String,
    student_id: String,
    program: String,
    institution: String,
    issue_date: String,
    certificate_hash: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

impl TryFrom<CertificateRow> for CertificateRecord {
    type Error = StoreError;

    fn try_from(row: CertificateRow) -> Result<Self, Self::Error> {
        let certificate_id = CertificateId::parse(&row.certificate_id)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        Ok(Self {
            certificate_id,
            name: row.name,
            student_id: row.student_id,
            program: row.program,
            institution: row.institution,
            issue_date: row.issue_date,
            certificate_hash: row.certificate_hash,
        })
    }
}

const CERTIFICATE_COLUMNS: &str = "certificate_id, name, student_id, program, institution, \
     issue_date, certificate_hash, created_at";

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Certificate records in the `certificates` table.
#[derive(Clone)]
pub struct PostgresCertificateStore {
    pool: PgPool,
}

impl PostgresCertificateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, record: &CertificateRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO certificates
                (certificate_id, name, student_id, program, institution, issue_date, certificate_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.certificate_id.as_str())
        .bind(&record.name)
        .bind(&record.student_id)
        .bind(&record.program)
        .bind(&record.institution)
        .bind(&record.issue_date)
        .bind(&record.certificate_hash)
        .execute(&self.pool)
        .await?;

        tracing::debug!(certificate_id = %record.certificate_id, "Stored certificate record");
        Ok(())
    }

    pub async fn find_by_hash(&self, hash: &str) -> Result<Option<CertificateRecord>, StoreError> {
        let row: Option<CertificateRow> = sqlx::query_as(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE certificate_hash = $1"
        ))
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<CertificateRecord>, StoreError> {
        let row: Option<CertificateRow> = sqlx::query_as(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE certificate_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn list(&self, query: &ListQuery) -> Result<CertificatePage, StoreError> {
        let pattern = query.student_id.as_deref().map(like_pattern);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM certificates
            WHERE ($1::TEXT IS NULL OR student_id ILIKE $1 ESCAPE '\')
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows: Vec<CertificateRow> = sqlx::query_as(&format!(
            r#"
            SELECT {CERTIFICATE_COLUMNS} FROM certificates
            WHERE ($1::TEXT IS NULL OR student_id ILIKE $1 ESCAPE '\')
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&pattern)
        .bind(i64::from(query.page_size))
        .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<CertificateRecord>, _>>()?;

        Ok(CertificatePage::new(records, query, total.max(0) as u64))
    }

    pub async fn delete(&self, id: &str) -> Result<Option<CertificateRecord>, StoreError> {
        let row: Option<CertificateRow> = sqlx::query_as(&format!(
            "DELETE FROM certificates WHERE certificate_id = $1 RETURNING {CERTIFICATE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn check_health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Admin identities in the `admins` table.
#[derive(Clone)]
pub struct PostgresAdminStore {
    pool: PgPool,
}

impl PostgresAdminStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminIdentity>, StoreError> {
        let admin = sqlx::query_as::<_, AdminIdentity>(
            "SELECT id, username, password_hash, created_at FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AdminIdentity>, StoreError> {
        let admin = sqlx::query_as::<_, AdminIdentity>(
            "SELECT id, username, password_hash, created_at FROM admins WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(admin)
    }

    pub async fn create(&self, admin: &AdminIdentity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO admins (id, username, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(admin.id)
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(admin.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("123"), "%123%");
        assert_eq!(like_pattern("10%_x"), "%10\\%\\_x%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
