use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{oneshot, Mutex};

use crate::errors::{VizCueError, VizCueResult};
use crate::geometry::ScreenPoint;

/// A click the user is about to be asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickPlan {
    pub point: ScreenPoint,
    pub screen_width: u32,
    pub screen_height: u32,
    /// Shown in the yes/no prompt.
    pub label: String,
}

impl ClickPlan {
    pub fn new(point: ScreenPoint, screen_width: u32, screen_height: u32, label: impl Into<String>) -> Self {
        Self {
            point,
            screen_width,
            screen_height,
            label: label.into(),
        }
    }

    /// `[0, width) × [0, height)`; never clamps.
    pub fn check_bounds(&self) -> VizCueResult<()> {
        let ScreenPoint { x, y } = self.point;
        let inside = x >= 0
            && y >= 0
            && (x as u32) < self.screen_width
            && (y as u32) < self.screen_height;
        if inside {
            Ok(())
        } else {
            Err(VizCueError::OutOfScreenBounds {
                x,
                y,
                width: self.screen_width,
                height: self.screen_height,
            })
        }
    }
}

/// Proof that the user said yes. Only [`confirm`] builds one, so an
/// unconfirmed plan cannot reach the pointer.
#[derive(Debug)]
pub struct Confirmed<T>(T);

impl<T> Confirmed<T> {
    pub fn get(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// `true` means go ahead.
    async fn ask(&self, plan: &ClickPlan) -> VizCueResult<bool>;
}

/// Ask the gate about `plan`. Out-of-screen plans are rejected before the
/// user is bothered.
pub async fn confirm(gate: &dyn ConfirmationGate, plan: ClickPlan) -> VizCueResult<Confirmed<ClickPlan>> {
    plan.check_bounds()?;
    if gate.ask(&plan).await? {
        tracing::info!(x = plan.point.x, y = plan.point.y, label = %plan.label, "click confirmed");
        Ok(Confirmed(plan))
    } else {
        tracing::info!(x = plan.point.x, y = plan.point.y, "click declined");
        Err(VizCueError::ActionDeclined)
    }
}

/// Gate answered once through a channel, e.g. by the next console line.
/// A dropped sender counts as "no".
pub struct ReplyGate {
    reply: Mutex<Option<oneshot::Receiver<bool>>>,
}

impl ReplyGate {
    pub fn new() -> (oneshot::Sender<bool>, Self) {
        let (tx, rx) = oneshot::channel();
        (
            tx,
            Self {
                reply: Mutex::new(Some(rx)),
            },
        )
    }
}

#[async_trait]
impl ConfirmationGate for ReplyGate {
    async fn ask(&self, _plan: &ClickPlan) -> VizCueResult<bool> {
        let rx = self.reply.lock().await.take();
        match rx {
            Some(rx) => Ok(rx.await.unwrap_or(false)),
            None => Ok(false),
        }
    }
}
