use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    /// Starting, inspecting or reaching a throwaway database failed.
    #[error("test database container: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
}

pub type Result<T, E = TestInfraError> = std::result::Result<T, E>;
