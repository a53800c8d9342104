//! A bounded, drop-oldest-on-overflow channel used to hand [`TradeEvent`]s
//! from the whale activity monitor to the portfolio risk manager without
//! ever blocking the poll loop on a slow consumer.
//!
//! [`TradeEvent`]: crate::domain::TradeEvent

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    notify: Notify,
    capacity: usize,
}

/// Producer half. `send` never blocks: once the queue is at capacity, the
/// oldest entry is evicted to make room for the new one.
pub struct DropOldestSender<T> {
    shared: Arc<Shared<T>>,
}

/// Consumer half.
pub struct DropOldestReceiver<T> {
    shared: Arc<Shared<T>>,
}

/// Build a drop-oldest channel with room for `capacity` items.
#[must_use]
pub fn drop_oldest_channel<T>(capacity: usize) -> (DropOldestSender<T>, DropOldestReceiver<T>) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        notify: Notify::new(),
        capacity,
    });
    (
        DropOldestSender { shared: shared.clone() },
        DropOldestReceiver { shared },
    )
}

impl<T> Clone for DropOldestSender<T> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<T> DropOldestSender<T> {
    /// Push a value, evicting the oldest queued value (and logging it was
    /// dropped) if the queue was already at capacity.
    pub fn send(&self, value: T) {
        let mut queue = self.shared.queue.lock();
        if queue.len() >= self.shared.capacity {
            queue.pop_front();
            tracing::warn!(target: "whale", "trade event queue full, dropped oldest event");
        }
        queue.push_back(value);
        drop(queue);
        self.shared.notify.notify_one();
    }
}

impl<T> DropOldestReceiver<T> {
    /// Wait for and pop the oldest queued value.
    pub async fn recv(&mut self) -> T {
        loop {
            if let Some(value) = self.shared.queue.lock().pop_front() {
                return value;
            }
            self.shared.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_then_recv_roundtrips() {
        let (tx, mut rx) = drop_oldest_channel(4);
        tx.send(1);
        tx.send(2);
        assert_eq!(rx.recv().await, 1);
        assert_eq!(rx.recv().await, 2);
    }

    #[tokio::test]
    async fn overflow_drops_oldest() {
        let (tx, mut rx) = drop_oldest_channel(2);
        tx.send(1);
        tx.send(2);
        tx.send(3); // evicts 1
        assert_eq!(rx.recv().await, 2);
        assert_eq!(rx.recv().await, 3);
    }
}
