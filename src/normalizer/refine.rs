//! Post-processing steps applied to a normalized rectangle before the
//! sanity clamps. These are display-quality heuristics, not correctness
//! rules, so each one can be swapped out or disabled.

use crate::geometry::Rect;

#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    pub rect: Rect,
    /// Overrides the generic minimum side length when set.
    pub min_size: Option<f64>,
}

pub trait RectRefiner: Send + Sync {
    fn name(&self) -> &'static str;

    /// `context` is the full response text the rectangle came from.
    /// Returns `None` when the refiner does not apply.
    fn refine(&self, rect: Rect, context: &str) -> Option<Refinement>;
}

/// Reshape boxes around app/dock icons into a slightly tighter square.
///
/// Mail-icon phrasing gets the tighter factor; generic dock/taskbar phrasing
/// is skipped for strongly elongated boxes, which are unlikely to be icons.
#[derive(Debug, Clone)]
pub struct IconSquaring {
    pub mail_terms: Vec<String>,
    pub dock_terms: Vec<String>,
    pub mail_factor: f64,
    pub dock_factor: f64,
    pub icon_min_size: f64,
}

impl Default for IconSquaring {
    fn default() -> Self {
        Self {
            mail_terms: ["mail app", "mail icon", "mail application", "email app", "email icon"]
                .map(String::from)
                .to_vec(),
            dock_terms: ["dock", "taskbar", "launcher"].map(String::from).to_vec(),
            mail_factor: 0.85,
            dock_factor: 0.90,
            icon_min_size: 20.0,
        }
    }
}

impl IconSquaring {
    pub fn with_min_size(icon_min_size: f64) -> Self {
        Self {
            icon_min_size,
            ..Self::default()
        }
    }
}

impl RectRefiner for IconSquaring {
    fn name(&self) -> &'static str {
        "icon_squaring"
    }

    fn refine(&self, rect: Rect, context: &str) -> Option<Refinement> {
        let lower = context.to_lowercase();
        let mentions = |terms: &[String]| terms.iter().any(|t| lower.contains(t.as_str()));

        let factor = if mentions(&self.mail_terms) {
            self.mail_factor
        } else if mentions(&self.dock_terms) {
            let (w, h) = (rect.width(), rect.height());
            if w > h * 3.0 || h > w * 3.0 {
                return None;
            }
            self.dock_factor
        } else {
            return None;
        };

        let side = rect.width().min(rect.height()) * factor;
        let (cx, cy) = rect.center();
        tracing::debug!(factor, side, "icon squaring applied");
        Some(Refinement {
            rect: Rect::from_center(cx, cy, side, side),
            min_size: Some(self.icon_min_size),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_icon_becomes_tighter_square() {
        let r = Rect::new(100.0, 100.0, 200.0, 160.0);
        let out = IconSquaring::default().refine(r, "Click the Mail icon in the Dock").unwrap();
        assert!((out.rect.width() - 51.0).abs() < 1e-9);
        assert!((out.rect.height() - 51.0).abs() < 1e-9);
        assert_eq!(out.rect.center(), r.center());
        assert_eq!(out.min_size, Some(20.0));
    }

    #[test]
    fn dock_phrasing_uses_looser_factor() {
        let r = Rect::new(0.0, 0.0, 100.0, 100.0);
        let out = IconSquaring::default().refine(r, "It sits in the taskbar").unwrap();
        assert!((out.rect.width() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn elongated_dock_boxes_are_left_alone() {
        let r = Rect::new(0.0, 0.0, 400.0, 50.0);
        assert!(IconSquaring::default().refine(r, "the whole dock").is_none());
    }

    #[test]
    fn unrelated_text_does_not_apply() {
        let r = Rect::new(0.0, 0.0, 40.0, 40.0);
        assert!(IconSquaring::default().refine(r, "the Save button").is_none());
    }
}
