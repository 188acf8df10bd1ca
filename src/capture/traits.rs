use async_trait::async_trait;

use crate::capture::types::CapturedFrame;
use crate::errors::VizCueResult;

/// Source of screenshots. The engine only sees this trait, so tests can
/// hand it canned frames.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    async fn capture(&self) -> VizCueResult<CapturedFrame>;
}
