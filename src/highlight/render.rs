use crate::highlight::state::HighlightView;

/// Receives the full set of currently visible highlights after every change.
/// The manager owns state only; drawing is the sink's business.
pub trait RenderSink: Send {
    fn render(&mut self, highlights: &[HighlightView]);
}

impl<F> RenderSink for F
where
    F: FnMut(&[HighlightView]) + Send,
{
    fn render(&mut self, highlights: &[HighlightView]) {
        self(highlights)
    }
}

/// Console stand-in for an overlay window.
#[derive(Debug, Default)]
pub struct LogRenderer;

impl RenderSink for LogRenderer {
    fn render(&mut self, highlights: &[HighlightView]) {
        if highlights.is_empty() {
            tracing::info!("overlay cleared");
            return;
        }
        for h in highlights {
            tracing::info!(
                id = %h.id,
                x = h.rect.x,
                y = h.rect.y,
                w = h.rect.width,
                h = h.rect.height,
                flashing = h.flashing,
                click_indicator = h.show_click_indicator,
                message = h.message.as_deref().unwrap_or(""),
                "overlay highlight"
            );
        }
    }
}
