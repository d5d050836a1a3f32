//! Serial alert playback.
//!
//! One player task owns the visual surface. It drains the queue one alert
//! at a time through a fixed enter/hold/exit cycle and never starts the
//! next alert before the previous one has fully left the screen. When the
//! queue runs dry the task parks on a [`Notify`] until the poller wakes it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::sleep;

use crate::scheduler::TaskHandle;

use super::mapping::AlertRecord;

/// Where an on-screen alert is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Sliding in.
    Entering,
    /// Fully visible.
    Holding,
    /// Sliding out.
    Exiting,
}

impl PlaybackPhase {
    /// Short lowercase tag, e.g. for a CSS class or a log field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackPhase::Entering => "enter",
            PlaybackPhase::Holding => "hold",
            PlaybackPhase::Exiting => "exit",
        }
    }
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives playback commands from the player task.
///
/// Calls arrive strictly ordered: `show`, then one `set_phase` per phase in
/// lifecycle order, then `hide`. `hide` is also called when the queue
/// drains, so implementations must tolerate hiding an already-hidden
/// surface.
pub trait AlertRenderer: Send + Sync + std::fmt::Debug {
    /// Mount a new alert on the surface.
    fn show(&self, alert: &AlertRecord);
    /// Move the mounted alert to the given phase.
    fn set_phase(&self, phase: PlaybackPhase);
    /// Clear the surface.
    fn hide(&self);
}

/// Durations of the playback phases and the gap between alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTimings {
    pub enter: Duration,
    pub hold: Duration,
    pub exit: Duration,
    pub gap: Duration,
}

impl Default for PlaybackTimings {
    fn default() -> Self {
        Self {
            enter: Duration::from_millis(320),
            hold: Duration::from_millis(3600),
            exit: Duration::from_millis(420),
            gap: Duration::from_millis(260),
        }
    }
}

/// Spawn the player task.
///
/// `playing` is the published busy flag: the poller only needs to touch
/// `wake` when it is false.
pub(crate) fn spawn_player(
    queue: Arc<Mutex<VecDeque<AlertRecord>>>,
    wake: Arc<Notify>,
    playing: Arc<AtomicBool>,
    renderer: Arc<dyn AlertRenderer>,
    timings: PlaybackTimings,
) -> TaskHandle {
    let task = tokio::spawn(async move {
        loop {
            // Guard dropped before any await.
            let next = queue.lock().unwrap().pop_front();
            match next {
                Some(alert) => {
                    playing.store(true, Ordering::SeqCst);
                    renderer.show(&alert);
                    renderer.set_phase(PlaybackPhase::Entering);
                    sleep(timings.enter).await;
                    renderer.set_phase(PlaybackPhase::Holding);
                    sleep(timings.hold).await;
                    renderer.set_phase(PlaybackPhase::Exiting);
                    sleep(timings.exit).await;
                    renderer.hide();
                    sleep(timings.gap).await;
                }
                None => {
                    playing.store(false, Ordering::SeqCst);
                    renderer.hide();
                    wake.notified().await;
                }
            }
        }
    });
    TaskHandle::new(task)
}
