use std::time::Duration;

use async_trait::async_trait;
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

use crate::errors::{VizCueError, VizCueResult};

/// Pointer injection seam. Coordinates are live-screen pixels.
#[async_trait]
pub trait PointerDriver: Send + Sync {
    /// Move to `(x, y)`, spreading the motion over `duration`.
    async fn move_to(&self, x: i32, y: i32, duration: Duration) -> VizCueResult<()>;
    /// Left click at the current position.
    async fn click(&self) -> VizCueResult<()>;
}

/// `enigo`-backed driver. Every call builds its own `Enigo` on a blocking
/// worker, so the driver itself holds no platform handle.
#[derive(Debug, Clone)]
pub struct EnigoPointer {
    steps: u32,
}

impl EnigoPointer {
    pub fn new(steps: u32) -> Self {
        Self { steps: steps.max(1) }
    }
}

impl Default for EnigoPointer {
    fn default() -> Self {
        Self::new(25)
    }
}

fn enigo() -> VizCueResult<Enigo> {
    Enigo::new(&Settings::default()).map_err(|e| VizCueError::Input(format!("enigo init: {e}")))
}

fn input_err(e: impl std::fmt::Display) -> VizCueError {
    VizCueError::Input(e.to_string())
}

#[async_trait]
impl PointerDriver for EnigoPointer {
    async fn move_to(&self, x: i32, y: i32, duration: Duration) -> VizCueResult<()> {
        let steps = self.steps;
        tokio::task::spawn_blocking(move || -> VizCueResult<()> {
            let mut enigo = enigo()?;
            let (sx, sy) = enigo.location().map_err(input_err)?;
            let pause = duration / steps;
            for (px, py) in interpolate((sx, sy), (x, y), steps) {
                enigo.move_mouse(px, py, Coordinate::Abs).map_err(input_err)?;
                if !pause.is_zero() {
                    std::thread::sleep(pause);
                }
            }
            Ok(())
        })
        .await
        .map_err(input_err)??;
        tracing::debug!(x, y, ms = duration.as_millis() as u64, "pointer moved");
        Ok(())
    }

    async fn click(&self) -> VizCueResult<()> {
        tokio::task::spawn_blocking(|| -> VizCueResult<()> {
            let mut enigo = enigo()?;
            enigo.button(Button::Left, Direction::Click).map_err(input_err)
        })
        .await
        .map_err(input_err)??;
        tracing::debug!("pointer clicked");
        Ok(())
    }
}

/// Intermediate points from `from` to `to`, excluding the start and ending
/// exactly on the target.
pub fn interpolate(from: (i32, i32), to: (i32, i32), steps: u32) -> Vec<(i32, i32)> {
    let steps = steps.max(1);
    (1..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let x = from.0 as f64 + (to.0 - from.0) as f64 * t;
            let y = from.1 as f64 + (to.1 - from.1) as f64 * t;
            (x.round() as i32, y.round() as i32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_ends_on_target() {
        let path = interpolate((0, 0), (100, 50), 4);
        assert_eq!(path, vec![(25, 13), (50, 25), (75, 38), (100, 50)]);
    }

    #[test]
    fn zero_steps_jumps_straight_there() {
        assert_eq!(interpolate((5, 5), (9, 9), 0), vec![(9, 9)]);
    }
}
