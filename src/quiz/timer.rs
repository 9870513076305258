// src/quiz/timer.rs

use std::{future::Future, ops::ControlFlow, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

/// Disposable handle to a recurring countdown task.
///
/// Dropping an armed handle aborts the task, so a session that leaves
/// `Active` on any path cannot leave a ticking timer behind.
#[derive(Debug)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Stops the countdown.
    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Releases the handle without aborting the task. Used from the timer's
    /// own callback once it has decided to stop.
    pub fn detach(mut self) {
        self.task.take();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Runs `on_tick` once per `period`, starting one period from now, until it
/// returns `ControlFlow::Break` or the handle is cancelled.
pub fn spawn_countdown<F, Fut>(period: Duration, mut on_tick: F) -> TimerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ControlFlow<()>> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if on_tick().await.is_break() {
                break;
            }
        }
    });

    TimerHandle { task: Some(task) }
}
