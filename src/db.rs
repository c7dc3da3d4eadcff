use anyhow::{anyhow, bail, Context, Result};
use sqlx::any::{AnyConnectOptions, AnyPoolOptions};
use sqlx::{AnyPool, ConnectOptions, Row};
use std::str::FromStr;
use std::sync::Once;
use url::Url;

use crate::config::KsConfig;
use crate::export::{ks_video_url, KsVideo};

// Ensure drivers are installed exactly once for sqlx::any
static INSTALL_DRIVERS: Once = Once::new();

const SCHEMA_CONTENT_SQL: &str = r#"SELECT sch.id::bigint, bl.id::bigint, ct.id::bigint, ct.title, ct.description
    FROM "contents" AS ct
    JOIN content_block_bridges AS cbb ON ct.id = cbb.content_id
    JOIN blocks AS bl ON bl.id = cbb.block_id
    JOIN block_schema_bridges AS bsb ON bsb.block_id = bl.id
    JOIN schemas AS sch ON sch.id = bsb.schema_id
    WHERE ct.type = 'video' AND ct.hidden = 'f' AND sch.id = $1
    ORDER BY ct.id"#;

/// Connection URL for the Khanova škola database.
pub fn url_for(cfg: &KsConfig, password: &str) -> Result<String> {
    let mut url = Url::parse(&format!("postgres://{}/{}", cfg.host, cfg.database))
        .with_context(|| format!("invalid database host `{}`", cfg.host))?;
    url.set_username(&cfg.user).map_err(|_| anyhow!("cannot set database user"))?;
    if !password.is_empty() {
        url.set_password(Some(password)).map_err(|_| anyhow!("cannot set database password"))?;
    }
    Ok(url.into())
}

/// One row of the schema content query.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRow {
    pub schema_id: i64,
    pub block_id: i64,
    pub content_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl ContentRow {
    pub fn into_video(self) -> KsVideo {
        KsVideo {
            id: self.content_id,
            url: ks_video_url(self.schema_id, self.block_id, self.content_id),
            title: self.title,
            description: self.description,
        }
    }
}

#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self> {
        // Register compiled-in drivers for sqlx::any
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let opts = AnyConnectOptions::from_str(url).context("invalid database URL")?;
        // Quiet by default; callers can enable SQLX_LOG if they want
        let opts = opts.disable_statement_logging();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .context("failed to connect to the Khanova škola database")?;
        Ok(Self { pool })
    }

    pub async fn server_version(&self) -> Result<String> {
        let row = sqlx::query("SELECT version()").fetch_one(&self.pool).await?;
        Ok(row.try_get(0)?)
    }

    /// `(id, title)` of every schema, ordered by id.
    pub async fn list_schemas(&self) -> Result<Vec<(i64, String)>> {
        let rows = sqlx::query("SELECT id::bigint, title FROM schemas ORDER BY id").fetch_all(&self.pool).await?;
        rows.iter().map(|r| Ok((r.try_get(0)?, r.try_get(1)?))).collect()
    }

    /// Visible videos of a schema; an empty schema is an error.
    pub async fn schema_content(&self, schema_id: i32) -> Result<Vec<ContentRow>> {
        if schema_id < 1 {
            bail!("invalid schema id {schema_id}");
        }
        let rows = sqlx::query(SCHEMA_CONTENT_SQL).bind(schema_id).fetch_all(&self.pool).await?;
        if rows.is_empty() {
            bail!("0 rows in schema id {schema_id}");
        }
        tracing::info!("Found {} videos in schema id {schema_id}", rows.len());
        rows.iter()
            .map(|r| {
                Ok(ContentRow {
                    schema_id: r.try_get(0)?,
                    block_id: r.try_get(1)?,
                    content_id: r.try_get(2)?,
                    title: r.try_get(3)?,
                    description: r.try_get(4)?,
                })
            })
            .collect()
    }

    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database connection closed.");
    }
}
