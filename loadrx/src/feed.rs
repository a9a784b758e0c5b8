use futures_core::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Replay-latest broadcast of snapshots.
///
/// The current value and the observer list live together so that a new observer
/// is handed the current value and registered in one step. It can neither miss a
/// snapshot published right after joining nor see one twice.
pub(crate) struct SnapshotFeed<V> {
    current: V,
    observers: Vec<UnboundedSender<V>>,
}

impl<V: Clone> SnapshotFeed<V> {
    pub(crate) fn new(initial: V) -> Self {
        SnapshotFeed {
            current: initial,
            observers: Vec::new(),
        }
    }

    pub(crate) fn current(&self) -> &V {
        &self.current
    }

    /// Stores `value` as current and hands it to every live observer, in call order.
    /// Observers whose stream was dropped are forgotten here.
    pub(crate) fn publish(&mut self, value: V) {
        self.observers.retain(|tx| tx.send(value.clone()).is_ok());
        self.current = value;
    }

    pub(crate) fn subscribe(&mut self) -> SnapshotStream<V> {
        let (tx, rx) = unbounded_channel();
        // The receiver is alive, so the replay cannot fail.
        let _ = tx.send(self.current.clone());
        self.observers.push(tx);
        SnapshotStream { rx }
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.iter().filter(|tx| !tx.is_closed()).count()
    }
}

/// Stream of snapshots returned by
/// [`LoadingStateMachine::subscribe`](crate::LoadingStateMachine::subscribe).
///
/// Yields the snapshot current at subscription time, then every later snapshot in
/// the order the transitions happened. Ends when the machine is dropped. Dropping
/// the stream detaches this observer only.
#[derive(Debug)]
#[must_use = "Streams do nothing unless polled"]
pub struct SnapshotStream<V> {
    rx: UnboundedReceiver<V>,
}

impl<V> SnapshotStream<V> {
    /// Returns the next snapshot if one is already queued.
    pub fn try_next(&mut self) -> Option<V> {
        self.rx.try_recv().ok()
    }
}

impl<V> Stream for SnapshotStream<V> {
    type Item = V;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
