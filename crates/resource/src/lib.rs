//! Font sources for the mdforge post-processing pipeline.
//!
//! This crate provides platform-specific implementations of the
//! `FontSource` trait from mdforge-traits.
//!
//! ## Available Sources
//!
//! - [`FontFileLoader`]: Loads TrueType/OpenType files from the local filesystem
//! - [`SystemFontSource`]: Looks up installed faces with fontdb (feature: `system-fonts`)
//!
//! ## Re-exports
//!
//! For convenience, we also re-export the in-memory source from mdforge-traits:
//! - [`InMemoryFontSource`]: Pre-populated in-memory storage

mod filesystem;
#[cfg(feature = "system-fonts")]
mod system;

pub use filesystem::{family_name, FontFileLoader};
#[cfg(feature = "system-fonts")]
pub use system::SystemFontSource;

pub use mdforge_traits::InMemoryFontSource;
