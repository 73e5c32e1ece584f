//! Frame-paced message scheduling.
//!
//! Most messages are queued for consumption as soon as they are dispatched.
//! Pose and component updates are held back instead: only the latest update
//! per entity (or per component type and entity) is kept, and the survivors
//! are released when the server ends a frame. Consumers therefore see at most
//! one pose per entity per frame, while every other message keeps its
//! arrival order.

use crate::error::{ScheduleError, WireError};
use crate::msg::Msg;
use async_trait::async_trait;
use hagall_messages::hagall;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Capacity of the message queue when none is given.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Decides if and when a message can be consumed.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Admit `msg`.
    ///
    /// Waits while the queue is full, giving up when `cancel` fires.
    async fn dispatch(&self, msg: Msg, cancel: &CancellationToken) -> Result<(), ScheduleError>;

    /// Release the updates held back during the frame that just ended.
    ///
    /// Returns the number of released messages.
    async fn handle_frame(&self) -> usize;
}

/// Hands out dispatched messages in order.
#[async_trait]
pub trait Consumer: Send {
    /// Next message, or an error once `cancel` fires or the queue is closed
    /// and drained.
    async fn consume(&mut self, cancel: &CancellationToken) -> Result<Msg, ScheduleError>;

    /// The underlying queue, for callers running their own `select!` loop.
    fn messages(&mut self) -> &mut mpsc::Receiver<Msg>;

    /// Stop accepting messages. Queued messages can still be consumed.
    fn close(&mut self);
}

/// Identifies the slot a held-back update occupies.
///
/// Ordering puts every pose before every component update, which is also
/// the order slots are released in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoalesceKey {
    /// Pose of an entity.
    Pose {
        /// Updated entity.
        entity_id: u32,
    },
    /// Data of one component type on an entity.
    Component {
        /// Component type.
        component_type_id: u32,
        /// Updated entity.
        entity_id: u32,
    },
}

impl CoalesceKey {
    /// Slot of `msg`, or `None` when the message is not held back.
    ///
    /// Only coalesced message types have their payload decoded.
    pub fn for_msg(msg: &Msg) -> Result<Option<Self>, WireError> {
        match hagall::MsgType::try_from(msg.msg_type()) {
            Ok(hagall::MsgType::EntityUpdatePose) => {
                let update: hagall::EntityUpdatePose = msg.data_to()?;
                Ok(Some(CoalesceKey::Pose {
                    entity_id: update.entity_id,
                }))
            }
            Ok(hagall::MsgType::EntityComponentUpdate) => {
                let update: hagall::EntityComponentUpdate = msg.data_to()?;
                Ok(Some(CoalesceKey::Component {
                    component_type_id: update.entity_component_type_id,
                    entity_id: update.entity_id,
                }))
            }
            _ => Ok(None),
        }
    }
}

/// Producer half of the scheduler.
///
/// Cheap to clone; every clone feeds the same queue and pending slots.
#[derive(Debug, Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    queue: mpsc::Sender<Msg>,
    pending: Mutex<BTreeMap<CoalesceKey, Msg>>,
}

impl Scheduler {
    /// Scheduler with a queue of [`DEFAULT_QUEUE_CAPACITY`] messages.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Scheduler, MessageConsumer) {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Scheduler with a queue of `capacity` messages, at least one.
    pub fn with_capacity(capacity: usize) -> (Scheduler, MessageConsumer) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let scheduler = Scheduler {
            inner: Arc::new(Inner {
                queue: tx,
                pending: Mutex::new(BTreeMap::new()),
            }),
        };
        (scheduler, MessageConsumer { queue: rx })
    }

    /// Number of updates waiting for the end of the frame.
    pub fn pending_len(&self) -> usize {
        self.pending().len()
    }

    /// Whether the consumer closed the queue or went away.
    pub fn is_closed(&self) -> bool {
        self.inner.queue.is_closed()
    }

    fn pending(&self) -> MutexGuard<'_, BTreeMap<CoalesceKey, Msg>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn enqueue(&self, msg: Msg, cancel: &CancellationToken) -> Result<(), ScheduleError> {
        let msg = match self.inner.queue.try_send(msg) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(ScheduleError::Closed),
            Err(TrySendError::Full(msg)) => msg,
        };

        trace!(msg_type = msg.msg_type(), "message queue full, waiting");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScheduleError::Cancelled),
            sent = self.inner.queue.send(msg) => sent.map_err(|_| ScheduleError::Closed),
        }
    }
}

#[async_trait]
impl Dispatcher for Scheduler {
    async fn dispatch(&self, msg: Msg, cancel: &CancellationToken) -> Result<(), ScheduleError> {
        if self.is_closed() {
            return Err(ScheduleError::Closed);
        }

        match CoalesceKey::for_msg(&msg) {
            Ok(Some(key)) => {
                self.pending().insert(key, msg);
                Ok(())
            }
            Ok(None) => self.enqueue(msg, cancel).await,
            Err(source) => Err(ScheduleError::MalformedUpdate {
                msg_type: msg.msg_type(),
                source,
            }),
        }
    }

    async fn handle_frame(&self) -> usize {
        let updates = std::mem::take(&mut *self.pending());

        let mut released = 0;
        for (key, msg) in updates {
            if self.inner.queue.send(msg).await.is_err() {
                warn!(?key, "scheduler closed, dropping held back updates");
                break;
            }
            released += 1;
        }
        released
    }
}

/// Consumer half of the scheduler.
#[derive(Debug)]
pub struct MessageConsumer {
    queue: mpsc::Receiver<Msg>,
}

#[async_trait]
impl Consumer for MessageConsumer {
    async fn consume(&mut self, cancel: &CancellationToken) -> Result<Msg, ScheduleError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScheduleError::Cancelled),
            msg = self.queue.recv() => msg.ok_or(ScheduleError::Closed),
        }
    }

    fn messages(&mut self) -> &mut mpsc::Receiver<Msg> {
        &mut self.queue
    }

    fn close(&mut self) {
        self.queue.close();
    }
}
