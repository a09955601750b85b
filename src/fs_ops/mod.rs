pub mod engine;
pub mod types;

pub use engine::*;
pub use types::*;
