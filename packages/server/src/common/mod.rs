// Common types shared across the kernel and domain layers

pub mod entity_ids;
pub mod profile_blob;
pub mod types;

pub use entity_ids::*;
pub use profile_blob::{ProfileBlob, ProfileError};
pub use types::*;
