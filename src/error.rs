use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model has not been set up")]
    NotSetUp,

    #[error("invalid Hausdorff scaling: scale {scale} exceeds 1/{slices}")]
    InvalidScale { scale: f64, slices: usize },

    #[error("cannot enumerate the partition function over {spins} active spins")]
    TooManySpins { spins: usize },

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, ModelError>;
