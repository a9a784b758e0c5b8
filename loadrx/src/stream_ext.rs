use crate::LoadingSnapshot;
use futures_core::stream::{FusedStream, Stream};
use pin_project::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Extension trait for streams of [`LoadingSnapshot`], such as the change feed of a
/// [`LoadingStateMachine`](crate::LoadingStateMachine).
pub trait SnapshotStreamExt<T, E>: Stream<Item = LoadingSnapshot<T, E>> {
    /// Creates a stream that ends right after the first `Success` or `Error` snapshot.
    ///
    /// ## Examples
    ///
    /// ```
    /// use futures::StreamExt;
    /// use loadrx::{LoadingSnapshot, LoadingStateMachine, SnapshotStreamExt};
    ///
    /// # futures::executor::block_on(async {
    /// let machine: LoadingStateMachine<i32, String> = LoadingStateMachine::new();
    /// let feed = machine.subscribe();
    /// machine.start().unwrap();
    /// machine.succeed(Some(3)).unwrap();
    /// machine.start().unwrap();
    ///
    /// let seen: Vec<_> = feed.until_settled().collect().await;
    /// assert_eq!(seen.last(), Some(&LoadingSnapshot::success(Some(3))));
    /// assert_eq!(seen.len(), 3);
    /// # });
    /// ```
    fn until_settled(self) -> UntilSettled<Self>
    where
        Self: Sized,
    {
        UntilSettled {
            stream: self,
            settled: false,
        }
    }
}

impl<S, T, E> SnapshotStreamExt<T, E> for S where S: Stream<Item = LoadingSnapshot<T, E>> + ?Sized {}

/// Stream returned by [`SnapshotStreamExt::until_settled`].
#[pin_project(project = UntilSettledProj)]
#[derive(Debug)]
#[must_use = "Streams do nothing unless polled"]
pub struct UntilSettled<S> {
    #[pin]
    stream: S,
    settled: bool,
}

impl<S, T, E> Stream for UntilSettled<S>
where
    S: Stream<Item = LoadingSnapshot<T, E>>,
{
    type Item = LoadingSnapshot<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let UntilSettledProj { stream, settled } = self.project();

        if *settled {
            return Poll::Ready(None);
        }

        match stream.poll_next(cx) {
            Poll::Ready(Some(snapshot)) => {
                if snapshot.is_settled() {
                    *settled = true;
                }
                Poll::Ready(Some(snapshot))
            }
            Poll::Ready(None) => {
                *settled = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S, T, E> FusedStream for UntilSettled<S>
where
    S: Stream<Item = LoadingSnapshot<T, E>>,
{
    fn is_terminated(&self) -> bool {
        self.settled
    }
}
