// src/refresher.rs
use crate::auth::Session;
use crate::view::{ListSource, ListView};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(10);

/// Periodic reload of one view while a session is active.
pub struct Refresher;

impl Refresher {
    /// Starts ticking one period from now. The task ends when the watched
    /// session ends, the session gate goes away, or the handle is stopped.
    pub fn spawn<S: ListSource>(
        view: Arc<ListView<S>>,
        mut sessions: watch::Receiver<Option<Session>>,
        period: Duration,
    ) -> RefresherHandle {
        let (shutdown, mut stopped) = watch::channel(false);
        let name = view.source().name();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Refreshing {} every {:?}", name, period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let active = sessions.borrow().is_some();
                        if !active || view.is_closed() {
                            break;
                        }
                        match view.try_reload().await {
                            None => debug!("{} reload still in flight, tick skipped", name),
                            Some(Err(e)) => warn!("Periodic {} reload failed: {}", name, e),
                            Some(Ok(())) => {}
                        }
                    }
                    changed = sessions.changed() => {
                        if changed.is_err() || sessions.borrow().is_none() {
                            break;
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            info!("Stopped refreshing {}", name);
        });

        RefresherHandle {
            shutdown,
            task: Some(task),
        }
    }
}

pub struct RefresherHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl RefresherHandle {
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Stops ticking and waits for a reload in progress to finish.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Refresher task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for RefresherHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
