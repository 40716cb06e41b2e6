// rag_playground/src/postgres/mod.rs
// PostgreSQL storage for extracted company details.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::{Manager, Pool};
use secrecy::ExposeSecret;
use tokio_postgres::{Config as TokioPgConfig, NoTls, Row};
use tracing::info;

use crate::config::PostgresSettings;
use crate::error::{PlaygroundError, Result};
use crate::extraction::CompanyDetail;
use crate::retry::{execute_with_retry, wrap_error};

/// Schema of the `company_details` table.
pub const INIT_SQL: &str = include_str!("../../init.sql");

const INSERT_COMPANY: &str =
    "INSERT INTO company_details (company_name, founded_in, founded_by) VALUES ($1, $2, $3)";

const SELECT_COMPANIES: &str = "SELECT id, company_name, founded_in, founded_by, created_at
     FROM company_details
     ORDER BY founded_in";

/// A row of `company_details`.
#[derive(Debug, Clone, PartialEq,)]
pub struct StoredCompany {
    pub id:           i32,
    pub company_name: String,
    pub founded_in:   NaiveDate,
    pub founded_by:   Vec<String,>,
    pub created_at:   DateTime<Utc,>,
}

impl TryFrom<&Row,> for StoredCompany {
    type Error = PlaygroundError;

    fn try_from(row: &Row,) -> Result<Self,> {
        Ok(StoredCompany {
            id:           row.try_get("id",)?,
            company_name: row.try_get("company_name",)?,
            founded_in:   row.try_get("founded_in",)?,
            founded_by:   row.try_get("founded_by",)?,
            created_at:   row.try_get("created_at",)?,
        },)
    }
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn ensure_schema(&self,) -> Result<(),>;

    /// Inserts every record in one transaction and returns the row count.
    async fn insert_companies(&self, companies: &[CompanyDetail],) -> Result<u64,>;

    /// All stored companies ordered by founding date.
    async fn list_companies(&self,) -> Result<Vec<StoredCompany,>,>;
}

pub struct CompanyStore {
    pool: Pool,
}

impl CompanyStore {
    pub async fn connect(settings: &PostgresSettings,) -> Result<Self,> {
        let mut pg_config = TokioPgConfig::new();
        pg_config
            .host(&settings.host,)
            .port(settings.port,)
            .dbname(&settings.dbname,)
            .user(&settings.user,)
            .password(settings.password.expose_secret(),);

        let manager = Manager::new(pg_config, NoTls,);
        let pool = Pool::builder(manager,).max_size(4,).build().map_err(|e| {
            PlaygroundError::ConnectionError(format!("Failed to create PostgreSQL pool: {}", e),)
        },)?;

        // Test the connection with retry
        execute_with_retry(|| async {
            pool.get().await.map(|_| (),).map_err(|e| {
                wrap_error(PlaygroundError::ConnectionError(format!(
                    "Failed to get client from pool: {}",
                    e
                ),),)
            },)
        },)
        .await?;

        info!(
            "Connected to PostgreSQL at {}:{}/{}",
            settings.host, settings.port, settings.dbname
        );
        Ok(CompanyStore { pool, },)
    }
}

#[async_trait]
impl CompanyRepository for CompanyStore {
    async fn ensure_schema(&self,) -> Result<(),> {
        let client = self.pool.get().await?;

        execute_with_retry(|| async {
            client
                .batch_execute(INIT_SQL,)
                .await
                .map_err(|e| wrap_error(e.into(),),)
        },)
        .await
    }

    async fn insert_companies(&self, companies: &[CompanyDetail],) -> Result<u64,> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let statement = tx.prepare(INSERT_COMPANY,).await?;

        let mut inserted = 0;
        for company in companies {
            inserted += tx
                .execute(
                    &statement,
                    &[&company.company_name, &company.founded_in, &company.founded_by,],
                )
                .await?;
        }

        tx.commit().await?;
        Ok(inserted,)
    }

    async fn list_companies(&self,) -> Result<Vec<StoredCompany,>,> {
        let client = self.pool.get().await?;

        let rows = execute_with_retry(|| async {
            client
                .query(SELECT_COMPANIES, &[],)
                .await
                .map_err(|e| wrap_error(e.into(),),)
        },)
        .await?;

        rows.iter().map(StoredCompany::try_from,).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_defines_company_details_columns() {
        for column in ["id SERIAL PRIMARY KEY", "company_name", "founded_in DATE", "founded_by TEXT[]", "created_at",] {
            assert!(INIT_SQL.contains(column,), "missing {column}");
        }
        assert!(INIT_SQL.contains(crate::COMPANY_TABLE_NAME,));
    }
}
