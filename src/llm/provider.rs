use async_trait::async_trait;

use crate::errors::VizCueResult;
use crate::parser::ModelFamily;

/// Image + prompt in, free-form text out. Nothing about the wire protocol
/// leaks past this trait.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider identifier (matches the config.toml key).
    fn name(&self) -> &str;

    /// Model identifier sent to the service.
    fn model(&self) -> &str;

    fn family(&self) -> ModelFamily {
        ModelFamily::from_model_id(self.model())
    }

    /// `image_ref` is a URL or a `data:` URL.
    async fn analyze(&self, image_ref: &str, prompt: &str) -> VizCueResult<String>;
}
