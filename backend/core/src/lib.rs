pub mod error;
pub mod traits;
pub mod turn;

pub use error::QwenError;
pub use traits::{ChatBackend, ModelCatalog, ModelInfo, TextStream};
pub use turn::{Role, Turn};
