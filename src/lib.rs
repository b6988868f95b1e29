pub mod engine;
pub mod render;

pub use engine::*;
pub use render::{MarkupRenderer, StaticMarkup};
