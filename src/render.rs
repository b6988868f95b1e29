//! Markup rendering for composed component trees.
//!
//! The render pipeline hands every fully composed tree to a
//! [`MarkupRenderer`](backend::MarkupRenderer). The crate ships one backend,
//! [`StaticMarkup`](backends::static_markup::StaticMarkup); hosts with their
//! own serializer implement the trait instead.

pub mod backend;

/// Markup backends.
pub mod backends {
    /// Static HTML serializer
    pub mod static_markup;
}

pub use backend::MarkupRenderer;
pub use backends::static_markup::StaticMarkup;
