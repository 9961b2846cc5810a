pub mod decomposition;
pub mod error;
pub mod model;
pub mod projection;
pub mod returns;
pub mod time_value;
pub mod types;

pub use error::LboModelError;
pub use types::*;

/// Standard result type for all model operations
pub type LboModelResult<T> = Result<T, LboModelError>;
