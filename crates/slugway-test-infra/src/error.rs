use thiserror::Error;

pub type Result<T> = std::result::Result<T, TestInfraError>;

#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("mysql not reachable after {attempts} attempts: {source}")]
    NotReady {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("schema statement failed: {0}")]
    Schema(#[from] sqlx::Error),
}
