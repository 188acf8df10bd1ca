pub mod manager;
pub mod render;
pub mod state;

pub use manager::HighlightManager;
pub use render::{LogRenderer, RenderSink};
pub use state::{Highlight, HighlightPhase, HighlightRequest, HighlightView};
