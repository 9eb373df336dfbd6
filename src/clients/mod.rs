pub mod catalog;
pub mod embeddings;
pub mod tagging;

pub use catalog::*;
pub use embeddings::*;
pub use tagging::*;
