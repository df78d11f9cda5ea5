//! Wall-clock frame loop that feeds elapsed time into a [`TickDriver`].
//!
//! Each frame measures the real time since the previous frame, passes it to
//! [`TickDriver::advance`], and hands the resulting [`TickReport`] to a
//! [`FrameObserver`]. The loop ends on the shutdown future or once the root
//! tick reaches the configured limit.

use std::future::Future;
use std::time::Duration;

use timetick_core::{TickDriver, TickReport, TimeEvent};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Why the frame loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEndReason {
    /// The root tick reached `max_ticks`.
    MaxTicksReached,
    /// The shutdown future completed.
    Shutdown,
}

/// Outcome of a frame loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopResult {
    /// Why the loop ended.
    pub end_reason: LoopEndReason,
    /// Frames processed.
    pub frames: u64,
    /// Root tick when the loop ended.
    pub final_tick: u64,
}

/// Frame loop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Real time between frames.
    pub frame_interval: Duration,
    /// Stop once the root tick reaches this value.
    pub max_ticks: Option<u64>,
}

/// Receives the report of every frame.
pub trait FrameObserver {
    /// Called after each frame's time has been applied.
    fn on_frame(&mut self, report: &TickReport, driver: &TickDriver);
}

/// Logs every change event through `tracing`.
pub struct LogObserver {
    /// Template rendered at `info` whenever the root tick advances.
    pub template: Option<String>,
}

impl FrameObserver for LogObserver {
    fn on_frame(&mut self, report: &TickReport, driver: &TickDriver) {
        for event in &report.events {
            match event {
                TimeEvent::UnitChanged {
                    unit,
                    new_value,
                    old_value,
                } => debug!(unit = %unit, new_value, old_value, "Unit changed"),
                TimeEvent::TickAdvanced { tick } => debug!(tick, "Tick advanced"),
            }
        }
        if report.ticks_advanced() == 0 {
            return;
        }
        if let Some(template) = &self.template {
            info!(tick = driver.current_tick(), "{}", driver.formatted(template));
        }
    }
}

/// Run frames until `shutdown` completes or the tick limit is reached.
pub async fn run_frames<F>(
    driver: &mut TickDriver,
    settings: LoopSettings,
    observer: &mut dyn FrameObserver,
    shutdown: F,
) -> LoopResult
where
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(settings.frame_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut last = Instant::now();
    let mut frames: u64 = 0;

    info!(
        frame_interval_ms = settings.frame_interval.as_millis(),
        max_ticks = settings.max_ticks,
        "Frame loop starting"
    );

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!(tick = driver.current_tick(), frames, "Shutdown requested");
                return LoopResult {
                    end_reason: LoopEndReason::Shutdown,
                    frames,
                    final_tick: driver.current_tick(),
                };
            }

            now = interval.tick() => {
                let delta = now.saturating_duration_since(last).as_secs_f64();
                last = now;

                let report = driver.advance(delta);
                frames = frames.saturating_add(1);
                observer.on_frame(&report, driver);

                if settings
                    .max_ticks
                    .is_some_and(|max| driver.current_tick() >= max)
                {
                    info!(tick = driver.current_tick(), frames, "Tick limit reached");
                    return LoopResult {
                        end_reason: LoopEndReason::MaxTicksReached,
                        frames,
                        final_tick: driver.current_tick(),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use timetick_core::UNBOUNDED;

    /// Records every report for later inspection.
    #[derive(Default)]
    struct Recorder {
        reports: Vec<TickReport>,
    }

    impl FrameObserver for Recorder {
        fn on_frame(&mut self, report: &TickReport, _driver: &TickDriver) {
            self.reports.push(report.clone());
        }
    }

    fn quarter_second_frames(max_ticks: Option<u64>) -> LoopSettings {
        LoopSettings {
            frame_interval: Duration::from_millis(250),
            max_ticks,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn four_quarter_second_frames_make_one_tick() {
        let mut driver = TickDriver::new(1.0);
        let mut recorder = Recorder::default();

        let result = run_frames(
            &mut driver,
            quarter_second_frames(Some(1)),
            &mut recorder,
            std::future::pending(),
        )
        .await;

        assert_eq!(result.end_reason, LoopEndReason::MaxTicksReached);
        assert_eq!(result.final_tick, 1);
        // The first frame fires immediately with no elapsed time.
        assert_eq!(result.frames, 5);
        let ticked: usize = recorder.reports.iter().map(TickReport::ticks_advanced).sum();
        assert_eq!(ticked, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_future_stops_the_loop() {
        let mut driver = TickDriver::new(1.0);
        driver
            .units_mut()
            .register_simple("half", "tick", 1, UNBOUNDED, 0)
            .unwrap();
        let mut recorder = Recorder::default();

        let result = run_frames(
            &mut driver,
            quarter_second_frames(None),
            &mut recorder,
            tokio::time::sleep(Duration::from_millis(2_100)),
        )
        .await;

        assert_eq!(result.end_reason, LoopEndReason::Shutdown);
        assert_eq!(result.final_tick, 2);
        assert_eq!(driver.value("half"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_driver_runs_frames_without_ticks() {
        let mut driver = TickDriver::new(1.0);
        driver.pause();
        let mut recorder = Recorder::default();

        let result = run_frames(
            &mut driver,
            quarter_second_frames(None),
            &mut recorder,
            tokio::time::sleep(Duration::from_millis(1_100)),
        )
        .await;

        assert_eq!(result.final_tick, 0);
        assert!(result.frames > 0);
        assert!(recorder.reports.iter().all(TickReport::is_empty));
    }
}
