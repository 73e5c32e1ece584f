//! Fixed-rate frame ticks driving a [`Dispatcher`].

use hagall_net::Dispatcher;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const MIN_FRAME_DURATION: Duration = Duration::from_millis(1);

/// Calls [`Dispatcher::handle_frame`] once per frame until cancelled.
///
/// A frame that overruns its slot delays the next one instead of causing a
/// burst of catch-up frames.
#[derive(Debug)]
pub struct FrameDriver<D> {
    dispatcher: D,
    frame_duration: Duration,
}

impl<D: Dispatcher> FrameDriver<D> {
    /// Driver ticking every `frame_duration`, at least every millisecond.
    pub fn new(dispatcher: D, frame_duration: Duration) -> Self {
        Self {
            dispatcher,
            frame_duration: frame_duration.max(MIN_FRAME_DURATION),
        }
    }

    /// Run until `cancel` fires. Returns the number of frames handled.
    pub async fn run(self, cancel: CancellationToken) -> u64 {
        let mut ticker = time::interval(self.frame_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        let mut frames = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    // Releasing blocks while the queue is full.
                    let released = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        released = self.dispatcher.handle_frame() => released,
                    };
                    frames += 1;
                    if released > 0 {
                        trace!(frame = frames, released, "frame released updates");
                    }
                }
            }
        }

        debug!(frames, "frame driver stopped");
        frames
    }

    /// Run on a new task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<u64>
    where
        D: 'static,
    {
        tokio::spawn(self.run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hagall_net::{Consumer, Msg, Scheduler};
    use hagall_testkit::pose_update;

    #[tokio::test(start_paused = true)]
    async fn releases_updates_every_frame() {
        let (scheduler, mut consumer) = Scheduler::new();
        let cancel = CancellationToken::new();
        let driver =
            FrameDriver::new(scheduler.clone(), Duration::from_millis(10)).spawn(cancel.clone());

        for x in 0..3 {
            let msg = Msg::from_proto(&pose_update(1, [x as f32, 0.0, 0.0])).unwrap();
            scheduler.dispatch(msg, &cancel).await.unwrap();
        }
        assert_eq!(scheduler.pending_len(), 1);

        let released = consumer.consume(&cancel).await.unwrap();
        let update: hagall_net::messages::hagall::EntityUpdatePose = released.data_to().unwrap();
        assert_eq!(update.pose.unwrap().px, 2.0);
        assert_eq!(scheduler.pending_len(), 0);

        cancel.cancel();
        assert!(driver.await.unwrap() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_at_the_configured_rate() {
        let (scheduler, _consumer) = Scheduler::new();
        let cancel = CancellationToken::new();
        let driver = FrameDriver::new(scheduler, Duration::from_millis(10)).spawn(cancel.clone());

        time::sleep(Duration::from_millis(105)).await;
        cancel.cancel();

        assert_eq!(driver.await.unwrap(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_while_queue_is_full() {
        let (scheduler, _consumer) = Scheduler::with_capacity(1);
        let cancel = CancellationToken::new();
        for entity_id in 1..=2 {
            let msg = Msg::from_proto(&pose_update(entity_id, [0.0, 0.0, 0.0])).unwrap();
            scheduler.dispatch(msg, &cancel).await.unwrap();
        }
        let driver =
            FrameDriver::new(scheduler.clone(), Duration::from_millis(10)).spawn(cancel.clone());

        time::sleep(Duration::from_millis(25)).await;
        cancel.cancel();

        time::timeout(Duration::from_secs(1), driver)
            .await
            .expect("frame driver did not stop")
            .unwrap();
    }
}
