use std::sync::Arc;
use std::time::Duration;

use crate::capture::ScreenContext;
use crate::config::ExecutorConfig;
use crate::errors::{VizCueError, VizCueResult};
use crate::executor::input::PointerDriver;
use crate::executor::safety::{confirm, ClickPlan, ConfirmationGate, Confirmed};
use crate::geometry::ScreenPoint;
use crate::grid::{GridCell, GridSpec};
use crate::normalizer::{grid_cell_target, NormalizedTarget};

/// Turns confirmed targets into pointer motion.
#[derive(Clone)]
pub struct ActionExecutor {
    driver: Arc<dyn PointerDriver>,
    move_duration: Duration,
}

impl ActionExecutor {
    pub fn new(driver: Arc<dyn PointerDriver>, config: &ExecutorConfig) -> Self {
        Self {
            driver,
            move_duration: Duration::from_millis(config.move_duration_ms),
        }
    }

    /// Move with a visible transition, then click. Driver failures come back
    /// as `Input` errors.
    pub async fn move_and_click(&self, plan: Confirmed<ClickPlan>) -> VizCueResult<ScreenPoint> {
        let plan = plan.into_inner();
        plan.check_bounds()?;
        let ScreenPoint { x, y } = plan.point;

        tracing::info!(x, y, label = %plan.label, "moving pointer");
        self.driver
            .move_to(x, y, self.move_duration)
            .await
            .map_err(as_input_error)?;
        self.driver.click().await.map_err(as_input_error)?;
        tracing::info!(x, y, "clicked");
        Ok(plan.point)
    }

    /// Ask, then click the center of an already normalized target.
    pub async fn click_target(
        &self,
        target: &NormalizedTarget,
        ctx: &ScreenContext,
        label: &str,
        gate: &dyn ConfirmationGate,
    ) -> VizCueResult<ScreenPoint> {
        let plan = ClickPlan::new(target.center, ctx.live_width, ctx.live_height, label);
        let confirmed = confirm(gate, plan).await?;
        self.move_and_click(confirmed).await
    }

    pub async fn click_grid_cell(
        &self,
        cell: GridCell,
        grid: &GridSpec,
        ctx: &ScreenContext,
        gate: &dyn ConfirmationGate,
    ) -> VizCueResult<ScreenPoint> {
        let target = grid_cell_target(cell, grid, ctx)?;
        let label = format!("Click grid cell {}", cell.id());
        self.click_target(&target, ctx, &label, gate).await
    }
}

fn as_input_error(e: VizCueError) -> VizCueError {
    match e {
        VizCueError::Input(_) => e,
        other => VizCueError::Input(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Move(i32, i32, Duration),
        Click,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        fail_click: bool,
    }

    #[async_trait]
    impl PointerDriver for Recorder {
        async fn move_to(&self, x: i32, y: i32, duration: Duration) -> VizCueResult<()> {
            self.calls.lock().unwrap().push(Call::Move(x, y, duration));
            Ok(())
        }

        async fn click(&self) -> VizCueResult<()> {
            if self.fail_click {
                return Err(VizCueError::Io(std::io::Error::other("no display")));
            }
            self.calls.lock().unwrap().push(Call::Click);
            Ok(())
        }
    }

    struct Answer(bool);

    #[async_trait]
    impl ConfirmationGate for Answer {
        async fn ask(&self, _plan: &ClickPlan) -> VizCueResult<bool> {
            Ok(self.0)
        }
    }

    fn executor(driver: Arc<Recorder>) -> ActionExecutor {
        ActionExecutor::new(driver, &ExecutorConfig::default())
    }

    #[tokio::test]
    async fn grid_click_moves_to_cell_center_then_clicks() {
        let driver = Arc::new(Recorder::default());
        let grid = GridSpec::new(4, 4).unwrap();
        let ctx = ScreenContext::uniform(1920, 1080);
        let point = executor(driver.clone())
            .click_grid_cell(GridCell::new(1, 2), &grid, &ctx, &Answer(true))
            .await
            .unwrap();
        assert_eq!(point, ScreenPoint { x: 1200, y: 405 });
        assert_eq!(
            *driver.calls.lock().unwrap(),
            vec![Call::Move(1200, 405, Duration::from_millis(500)), Call::Click]
        );
    }

    #[tokio::test]
    async fn declined_click_never_touches_the_pointer() {
        let driver = Arc::new(Recorder::default());
        let grid = GridSpec::new(4, 4).unwrap();
        let err = executor(driver.clone())
            .click_grid_cell(GridCell::new(0, 0), &grid, &ScreenContext::uniform(800, 600), &Answer(false))
            .await
            .unwrap_err();
        assert!(matches!(err, VizCueError::ActionDeclined));
        assert!(driver.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cell_outside_grid_is_reported() {
        let driver = Arc::new(Recorder::default());
        let grid = GridSpec::new(4, 4).unwrap();
        let err = executor(driver)
            .click_grid_cell(GridCell::new(2, 29), &grid, &ScreenContext::uniform(800, 600), &Answer(true))
            .await
            .unwrap_err();
        assert!(matches!(err, VizCueError::OutOfBounds { .. }));
    }

    #[tokio::test]
    async fn target_off_screen_is_rejected_not_clamped() {
        let driver = Arc::new(Recorder::default());
        let target = NormalizedTarget {
            rect: crate::geometry::PixelRect { x: 790, y: 10, width: 30, height: 30 },
            center: ScreenPoint { x: 805, y: 25 },
            refined_by: None,
        };
        let err = executor(driver.clone())
            .click_target(&target, &ScreenContext::uniform(800, 600), "Click", &Answer(true))
            .await
            .unwrap_err();
        assert!(matches!(err, VizCueError::OutOfScreenBounds { x: 805, y: 25, .. }));
        assert!(driver.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn driver_failures_surface_as_input_errors() {
        let driver = Arc::new(Recorder {
            fail_click: true,
            ..Recorder::default()
        });
        let grid = GridSpec::new(2, 2).unwrap();
        let err = executor(driver)
            .click_grid_cell(GridCell::new(0, 0), &grid, &ScreenContext::uniform(800, 600), &Answer(true))
            .await
            .unwrap_err();
        assert!(matches!(err, VizCueError::Input(ref m) if m.contains("no display")));
    }
}
