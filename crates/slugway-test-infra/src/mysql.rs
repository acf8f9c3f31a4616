use crate::{Result, TestInfraError};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

const MYSQL_PORT: u16 = 3306;
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "slugway".to_string(), setter(into))]
    database: String,
    #[builder(default = "slugway".to_string(), setter(into))]
    username: String,
    #[builder(default = "slugway".to_string(), setter(into))]
    password: String,
    /// Tag of the `mysql` image.
    #[builder(default = "8.4".to_string(), setter(into))]
    tag: String,
    /// Connection attempts made by [`MySqlServer::pool`] before giving up.
    #[builder(default = 20)]
    connect_attempts: u32,
}

/// A throwaway MySQL server holding the page, redirect and history tables
/// of one test.
///
/// The server compares strings byte-wise (`utf8mb4_bin`) so slug lookups are
/// case-sensitive. The container stops when the value is dropped.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", config.tag.as_str())
            .with_exposed_port(MYSQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_cmd([
                "--character-set-server=utf8mb4",
                "--collation-server=utf8mb4_bin",
            ])
            .start()
            .await?;

        Ok(Self { container, config })
    }

    /// `mysql://` URL of the test database as seen from the host.
    pub async fn database_url(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(MYSQL_PORT).await?;
        let MysqlConfig {
            database,
            username,
            password,
            ..
        } = &self.config;

        Ok(format!("mysql://{username}:{password}@{host}:{port}/{database}"))
    }

    /// Opens a pool, retrying while the server finishes its startup.
    ///
    /// The wait strategy fires on the first "ready for connections" line,
    /// which the entrypoint prints once before restarting the server.
    pub async fn pool(&self) -> Result<MySqlPool> {
        let url = self.database_url().await?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match MySqlPoolOptions::new().max_connections(5).connect(&url).await {
                Ok(pool) => return Ok(pool),
                Err(source) if attempt >= self.config.connect_attempts => {
                    return Err(TestInfraError::NotReady {
                        attempts: attempt,
                        source,
                    })
                }
                Err(_) => tokio::time::sleep(RETRY_DELAY).await,
            }
        }
    }

    /// Runs each DDL statement against `pool`.
    pub async fn apply_schema(pool: &MySqlPool, statements: &[&str]) -> Result<()> {
        for statement in statements {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }
}
