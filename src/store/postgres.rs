use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::model::{Plan, ServiceInstance};
use crate::store::traits::InstanceStore;

pub struct PostgresInstanceStore {
    pool: PgPool,
}

impl PostgresInstanceStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the instance table when missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS service_instances (
                id TEXT PRIMARY KEY,
                service_id TEXT NOT NULL,
                plan_id TEXT NOT NULL,
                group_id TEXT NOT NULL,
                dashboard_url TEXT NOT NULL,
                plan JSONB NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create service_instances table")?;

        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl InstanceStore for PostgresInstanceStore {
    async fn get_instance(&self, id: &str) -> Result<Option<ServiceInstance>> {
        let row = sqlx::query(
            "SELECT id, service_id, plan_id, group_id, dashboard_url, plan, created_at \
             FROM service_instances WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch service instance")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let plan_json: serde_json::Value = row.get("plan");
        let plan: Plan =
            serde_json::from_value(plan_json).context("Failed to decode persisted plan")?;

        Ok(Some(ServiceInstance {
            id: row.get("id"),
            service_id: row.get("service_id"),
            plan_id: row.get("plan_id"),
            group_id: row.get("group_id"),
            dashboard_url: row.get("dashboard_url"),
            plan,
            created_at: row.get("created_at"),
        }))
    }

    async fn upsert_instance(&self, instance: ServiceInstance) -> Result<()> {
        let plan_json =
            serde_json::to_value(&instance.plan).context("Failed to encode plan for storage")?;

        sqlx::query(
            r#"
            INSERT INTO service_instances (id, service_id, plan_id, group_id, dashboard_url, plan, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                service_id = EXCLUDED.service_id,
                plan_id = EXCLUDED.plan_id,
                group_id = EXCLUDED.group_id,
                dashboard_url = EXCLUDED.dashboard_url,
                plan = EXCLUDED.plan
            "#,
        )
        .bind(&instance.id)
        .bind(&instance.service_id)
        .bind(&instance.plan_id)
        .bind(&instance.group_id)
        .bind(&instance.dashboard_url)
        .bind(&plan_json)
        .bind(&instance.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert service instance")?;

        Ok(())
    }

    async fn delete_instance(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM service_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete service instance")?;

        Ok(result.rows_affected() > 0)
    }
}
