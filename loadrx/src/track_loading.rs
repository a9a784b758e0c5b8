use crate::{LoadingStateMachine, TrackLoadingError};
use futures_core::stream::{FusedStream, Stream};
use pin_project::{pin_project, pinned_drop};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, warn};

/// Extension trait that binds fallible streams to a [`LoadingStateMachine`].
///
/// Implemented for every stream of `Result<V, E>`. An `Ok` item is a value, an `Err`
/// item fails the operation and the end of the stream completes it.
pub trait TrackLoadingExt<V, E>: Stream<Item = Result<V, E>> {
    /// Drives `machine` from this stream, storing every emitted value as the machine's
    /// data.
    ///
    /// ## Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use futures::{stream, StreamExt};
    /// use loadrx::{LoadingStateMachine, TrackLoadingExt};
    ///
    /// # futures::executor::block_on(async {
    /// let machine = Arc::new(LoadingStateMachine::<i32, String>::new());
    /// let values: Vec<_> = stream::iter(vec![Ok(1), Ok(2)])
    ///     .track_loading_by(machine.clone())
    ///     .collect()
    ///     .await;
    ///
    /// assert_eq!(values, vec![Ok(1), Ok(2)]);
    /// assert!(machine.is_success());
    /// assert_eq!(machine.data(), Some(2));
    /// # });
    /// ```
    fn track_loading_by(
        self,
        machine: Arc<LoadingStateMachine<V, E>>,
    ) -> TrackLoading<Self, fn(&V) -> V, V, E>
    where
        Self: Sized,
        V: Clone,
        E: Clone,
    {
        let clone: fn(&V) -> V = <V as Clone>::clone;
        TrackLoading::new(self, machine, clone)
    }

    /// Like [`track_loading_by`](TrackLoadingExt::track_loading_by), but stores
    /// `mapper(&value)` as the machine's data. The values passed downstream are
    /// left untouched.
    fn track_loading_by_mapped<T, F>(
        self,
        machine: Arc<LoadingStateMachine<T, E>>,
        mapper: F,
    ) -> TrackLoading<Self, F, T, E>
    where
        Self: Sized,
        T: Clone,
        E: Clone,
        F: FnMut(&V) -> T,
    {
        TrackLoading::new(self, machine, mapper)
    }
}

impl<S, V, E> TrackLoadingExt<V, E> for S where S: Stream<Item = Result<V, E>> + ?Sized {}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Phase {
    /// Not polled yet, the machine has not been touched.
    Idle,
    /// `start` succeeded and the source has not settled.
    Active,
    /// Settled, rejected or cancelled. The source is gone.
    Done,
}

/// Stream returned by [`TrackLoadingExt::track_loading_by`] and
/// [`TrackLoadingExt::track_loading_by_mapped`].
///
/// Every item of the source is passed through. On the side, the tracked machine
/// follows the source:
///
/// - the first poll calls `start`; if the machine is already loading, the stream
///   yields [`TrackLoadingError::Transition`] and ends without polling the source;
/// - each value is mapped and handed to `update`;
/// - the end of the source calls `succeed` with the machine's current data;
/// - an error calls `fail` and is yielded as [`TrackLoadingError::Source`].
///
/// Dropping this stream before the source settled drops the source and, if the
/// machine is still loading, resets it to `NotStarted`. A cancellation token set
/// through [`with_cancellation`](TrackLoading::with_cancellation) does the same and
/// ends the stream.
#[pin_project(PinnedDrop, project = TrackLoadingProj)]
#[must_use = "Streams do nothing unless polled"]
pub struct TrackLoading<S, F, T: Clone, E: Clone> {
    #[pin]
    source: Option<S>,
    machine: Arc<LoadingStateMachine<T, E>>,
    mapper: F,
    phase: Phase,
    cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
}

impl<S, F, T: Clone, E: Clone> TrackLoading<S, F, T, E> {
    fn new(source: S, machine: Arc<LoadingStateMachine<T, E>>, mapper: F) -> Self {
        TrackLoading {
            source: Some(source),
            machine,
            mapper,
            phase: Phase::Idle,
            cancelled: None,
        }
    }

    /// Cancels the tracked operation as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }

    pub fn machine(&self) -> &Arc<LoadingStateMachine<T, E>> {
        &self.machine
    }
}

impl<S, F, T: Clone, E: Clone> TrackLoadingProj<'_, S, F, T, E> {
    /// Releases the source after the operation settled or was rejected.
    fn finish(&mut self) {
        self.source.set(None);
        *self.phase = Phase::Done;
    }

    /// Releases the source of an operation that did not settle and, if the machine
    /// is still loading, puts it back to `NotStarted`.
    fn cancel(&mut self) {
        let phase = *self.phase;
        if phase == Phase::Done {
            return;
        }
        self.finish();
        if phase == Phase::Active && self.machine.is_loading() {
            debug!("tracked operation cancelled while loading, resetting");
            if let Err(error) = self.machine.reset() {
                warn!(%error, "failed to reset cancelled operation");
            }
        }
    }
}

impl<S, F, V, T, E> Stream for TrackLoading<S, F, T, E>
where
    S: Stream<Item = Result<V, E>>,
    F: FnMut(&V) -> T,
    T: Clone,
    E: Clone,
{
    type Item = Result<V, TrackLoadingError<E>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.phase == Phase::Done {
            return Poll::Ready(None);
        }

        if let Some(cancelled) = this.cancelled.as_mut() {
            if cancelled.as_mut().poll(cx).is_ready() {
                this.cancel();
                return Poll::Ready(None);
            }
        }

        if *this.phase == Phase::Idle {
            if let Err(error) = this.machine.start() {
                this.finish();
                return Poll::Ready(Some(Err(error.into())));
            }
            *this.phase = Phase::Active;
        }

        let item = match this.source.as_mut().as_pin_mut() {
            Some(source) => ready!(source.poll_next(cx)),
            None => return Poll::Ready(None),
        };

        match item {
            Some(Ok(value)) => {
                let data = (this.mapper)(&value);
                match this.machine.update(data) {
                    Ok(()) => Poll::Ready(Some(Ok(value))),
                    Err(error) => {
                        this.finish();
                        Poll::Ready(Some(Err(error.into())))
                    }
                }
            }
            Some(Err(error)) => {
                let failed = this.machine.fail(error.clone());
                this.finish();
                match failed {
                    Ok(()) => Poll::Ready(Some(Err(TrackLoadingError::Source(error)))),
                    Err(transition) => Poll::Ready(Some(Err(transition.into()))),
                }
            }
            None => {
                let succeeded = this.machine.succeed(this.machine.data());
                this.finish();
                match succeeded {
                    Ok(()) => Poll::Ready(None),
                    Err(transition) => Poll::Ready(Some(Err(transition.into()))),
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match (&self.phase, &self.source) {
            (Phase::Done, _) | (_, None) => (0, Some(0)),
            (_, Some(source)) => {
                // One extra item for a rejected transition.
                let (_, upper) = source.size_hint();
                (0, upper.and_then(|upper| upper.checked_add(1)))
            }
        }
    }
}

impl<S, F, V, T, E> FusedStream for TrackLoading<S, F, T, E>
where
    S: Stream<Item = Result<V, E>>,
    F: FnMut(&V) -> T,
    T: Clone,
    E: Clone,
{
    fn is_terminated(&self) -> bool {
        self.phase == Phase::Done
    }
}

#[pinned_drop]
impl<S, F, T: Clone, E: Clone> PinnedDrop for TrackLoading<S, F, T, E> {
    fn drop(self: Pin<&mut Self>) {
        self.project().cancel();
    }
}
