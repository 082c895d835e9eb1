//! Bounded FIFO hand-off of prediction ids from submitters to the worker

use tokio::sync::mpsc;

use crate::error::EngineError;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Create a queue holding at most `capacity` pending ids
pub fn request_queue(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Submitting side; cheap to clone
#[derive(Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<String>,
}

impl QueueSender {
    /// Enqueue an id, waiting while the queue is full
    pub async fn enqueue(&self, id: String) -> Result<(), EngineError> {
        self.tx.send(id).await.map_err(|_| EngineError::QueueClosed)
    }

    /// Free slots right now
    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }
}

/// Worker side
pub struct QueueReceiver {
    rx: mpsc::Receiver<String>,
}

impl QueueReceiver {
    /// Next id, waiting while the queue is empty. `None` once every sender
    /// is gone and the queue is drained.
    pub async fn dequeue(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
