pub mod image_ref;
pub mod prompts;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod types;

pub use image_ref::{resolve_image_reference, ImageStore};
pub use provider::VisionModel;
pub use registry::ModelSession;
