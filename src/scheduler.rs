//! Cancellable repeating tasks.
//!
//! Both engines run off a fixed-period tick. [`spawn_repeating`] owns that
//! loop: one tokio task, one [`tokio::time::interval`], the tick future
//! awaited to completion before the next period. A tick that outruns its
//! period delays the following tick instead of overlapping it, so engine
//! state never sees two concurrent ticks.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a spawned repeating task.
///
/// `stop` aborts the task; an in-flight tick is cancelled at its next await
/// point. Dropping the handle detaches the task instead.
#[derive(Debug)]
pub struct TaskHandle {
    inner: JoinHandle<()>,
}

impl TaskHandle {
    pub(crate) fn new(inner: JoinHandle<()>) -> Self {
        Self { inner }
    }

    /// Abort the task.
    pub fn stop(&self) {
        self.inner.abort();
    }

    /// True once the task has stopped running, for any reason.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

/// Run `tick` immediately and then once per `period`.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use atc_overlay::scheduler::spawn_repeating;
///
/// # async fn demo() {
/// let handle = spawn_repeating(Duration::from_secs(1), || async {
///     tracing::info!("tick");
/// });
/// // ...
/// handle.stop();
/// # }
/// ```
pub fn spawn_repeating<F, Fut>(period: Duration, mut tick: F) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            tick().await;
        }
    });
    TaskHandle::new(handle)
}
