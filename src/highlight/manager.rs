use std::time::Instant;

use crate::highlight::render::RenderSink;
use crate::highlight::state::{Highlight, HighlightPhase, HighlightRequest, HighlightView};

/// Owns every active highlight. Timers are not scheduled here: the caller
/// asks for [`next_deadline`](Self::next_deadline), sleeps, then calls
/// [`tick`](Self::tick). Dropping a highlight therefore drops its timers.
pub struct HighlightManager {
    highlights: Vec<Highlight>,
    sink: Box<dyn RenderSink>,
}

impl HighlightManager {
    pub fn new(sink: Box<dyn RenderSink>) -> Self {
        Self {
            highlights: Vec::new(),
            sink,
        }
    }

    pub fn add_highlight(&mut self, req: HighlightRequest, now: Instant) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let highlight = Highlight::new(id.clone(), req, now);
        tracing::debug!(
            id = %id,
            rect = ?highlight.rect,
            flashing = highlight.is_flashing(),
            expires = highlight.expires_at.is_some(),
            "highlight added"
        );
        self.highlights.push(highlight);
        self.render();
        id
    }

    /// No-op for unknown ids.
    pub fn remove_highlight(&mut self, id: &str) -> bool {
        let before = self.highlights.len();
        self.highlights.retain(|h| h.id != id);
        let removed = self.highlights.len() != before;
        if removed {
            tracing::debug!(id = %id, "highlight removed");
            self.render();
        }
        removed
    }

    pub fn clear_all(&mut self) {
        if self.highlights.is_empty() {
            return;
        }
        tracing::debug!(count = self.highlights.len(), "highlights cleared");
        self.highlights.clear();
        self.render();
    }

    /// Apply every flash toggle and expiry due at `now`; renders once if
    /// anything changed. Returns whether anything changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        self.highlights.retain(|h| {
            let expired = h.is_expired(now);
            if expired {
                tracing::debug!(id = %h.id, "highlight expired");
            }
            changed |= expired;
            !expired
        });
        for h in &mut self.highlights {
            changed |= h.advance_flash(now);
        }
        if changed {
            self.render();
        }
        changed
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.highlights.iter().filter_map(Highlight::next_deadline).min()
    }

    pub fn phase(&self, id: &str) -> HighlightPhase {
        self.get(id).map_or(HighlightPhase::Expired, Highlight::phase)
    }

    pub fn get(&self, id: &str) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == id)
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    pub fn visible(&self) -> Vec<HighlightView> {
        self.highlights
            .iter()
            .filter(|h| h.visible)
            .map(Highlight::view)
            .collect()
    }

    fn render(&mut self) {
        let views = self.visible();
        self.sink.render(&views);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::geometry::PixelRect;

    type Frames = Arc<Mutex<Vec<Vec<HighlightView>>>>;

    fn manager() -> (HighlightManager, Frames) {
        let frames: Frames = Arc::default();
        let sink = {
            let frames = frames.clone();
            move |views: &[HighlightView]| frames.lock().unwrap().push(views.to_vec())
        };
        (HighlightManager::new(Box::new(sink)), frames)
    }

    fn req() -> HighlightRequest {
        HighlightRequest::new(PixelRect { x: 0, y: 0, width: 50, height: 50 })
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn every_mutation_renders() {
        let (mut m, frames) = manager();
        let t0 = Instant::now();
        let id = m.add_highlight(req().with_message("Click here"), t0);
        assert_eq!(frames.lock().unwrap().len(), 1);
        assert_eq!(frames.lock().unwrap()[0][0].message.as_deref(), Some("Click here"));

        m.tick(t0 + ms(400));
        assert!(frames.lock().unwrap()[1].is_empty(), "hidden during off phase");

        m.remove_highlight(&id);
        assert_eq!(frames.lock().unwrap().len(), 3);
    }

    #[test]
    fn flashing_settles_into_steady_then_expires() {
        let (mut m, _) = manager();
        let t0 = Instant::now();
        let mut r = req();
        r.duration = ms(5000);
        let id = m.add_highlight(r, t0);

        assert_eq!(m.phase(&id), HighlightPhase::Flashing);
        m.tick(t0 + ms(4000));
        assert_eq!(m.phase(&id), HighlightPhase::Steady);
        assert!(m.get(&id).unwrap().visible);

        m.tick(t0 + ms(4999));
        assert_eq!(m.phase(&id), HighlightPhase::Steady);
        m.tick(t0 + ms(5000));
        assert_eq!(m.phase(&id), HighlightPhase::Expired);
        assert!(m.is_empty());
    }

    #[test]
    fn expiry_cuts_flashing_short() {
        let (mut m, _) = manager();
        let t0 = Instant::now();
        let id = m.add_highlight(req(), t0);
        m.tick(t0 + ms(3000));
        assert_eq!(m.phase(&id), HighlightPhase::Expired);
        assert!(m.next_deadline().is_none());
    }

    #[test]
    fn persistent_highlight_never_expires() {
        let (mut m, _) = manager();
        let t0 = Instant::now();
        let mut r = req();
        r.auto_expire = false;
        let id = m.add_highlight(r, t0);
        m.tick(t0 + Duration::from_secs(3600));
        assert_eq!(m.phase(&id), HighlightPhase::Steady);
        assert!(m.next_deadline().is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let (mut m, frames) = manager();
        let id = m.add_highlight(req(), Instant::now());
        assert!(m.remove_highlight(&id));
        assert!(!m.remove_highlight(&id));
        assert!(!m.remove_highlight("never-existed"));
        assert_eq!(frames.lock().unwrap().len(), 2);
    }

    #[test]
    fn clear_all_drops_pending_deadlines() {
        let (mut m, frames) = manager();
        let t0 = Instant::now();
        m.add_highlight(req(), t0);
        m.add_highlight(req(), t0 + ms(100));
        assert_eq!(m.len(), 2);
        assert_eq!(m.next_deadline(), Some(t0 + ms(400)));

        m.clear_all();
        assert!(m.is_empty());
        assert!(m.next_deadline().is_none());
        assert!(!m.tick(t0 + Duration::from_secs(10)));
        assert!(frames.lock().unwrap().last().unwrap().is_empty());
    }

    #[test]
    fn highlights_are_independent() {
        let (mut m, _) = manager();
        let t0 = Instant::now();
        let first = m.add_highlight(req(), t0);
        let mut r = req();
        r.flash = false;
        let second = m.add_highlight(r, t0 + ms(200));
        assert_eq!(m.phase(&first), HighlightPhase::Flashing);
        assert_eq!(m.phase(&second), HighlightPhase::Steady);
        assert_ne!(first, second);
    }
}
