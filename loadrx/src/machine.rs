use crate::feed::{SnapshotFeed, SnapshotStream};
use crate::{LifecycleState, LoadingSnapshot, TransitionError};
use futures_signals::signal::{Mutable, MutableSignalCloned, Signal, SignalExt};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Holds the lifecycle of one asynchronous operation and the payload that goes
/// with it.
///
/// The machine only moves along legal edges:
///
/// | call        | allowed from               | result                                  |
/// |-------------|----------------------------|-----------------------------------------|
/// | `start`     | NotStarted, Success, Error | Loading, previous data kept             |
/// | `update`    | Loading                    | Loading, data replaced                  |
/// | `succeed`   | Loading                    | Success, data set                       |
/// | `fail`      | Loading                    | Error, data cleared                     |
/// | `reset`     | Loading, Success, Error    | NotStarted, data and error cleared      |
///
/// Each legal transition publishes exactly one [`LoadingSnapshot`] to every
/// observer before it returns. A rejected one publishes nothing and leaves the
/// machine untouched.
///
/// ## Examples
///
/// ```
/// use loadrx::{LifecycleState, LoadingStateMachine};
///
/// let machine: LoadingStateMachine<u32, String> = LoadingStateMachine::new();
/// machine.start().unwrap();
/// machine.update(1).unwrap();
/// machine.succeed(Some(2)).unwrap();
///
/// assert_eq!(machine.state(), LifecycleState::Success);
/// assert_eq!(machine.data(), Some(2));
/// assert!(machine.start().is_ok());
/// assert!(machine.start().is_err());
/// ```
pub struct LoadingStateMachine<T: Clone, E: Clone> {
    feed: Mutex<SnapshotFeed<LoadingSnapshot<T, E>>>,
    signal: Mutable<LoadingSnapshot<T, E>>,
}

impl<T: Clone, E: Clone> LoadingStateMachine<T, E> {
    pub fn new() -> Self {
        Self::with_snapshot(LoadingSnapshot::NotStarted)
    }

    /// A machine that is already loading, optionally showing `data`.
    pub fn as_loading(data: Option<T>) -> Self {
        Self::with_snapshot(LoadingSnapshot::loading(data))
    }

    /// A machine that already succeeded with `data`.
    pub fn as_success(data: T) -> Self {
        Self::with_snapshot(LoadingSnapshot::success(Some(data)))
    }

    /// A machine that already failed with `error`.
    pub fn as_error(error: E) -> Self {
        Self::with_snapshot(LoadingSnapshot::fail(error))
    }

    fn with_snapshot(snapshot: LoadingSnapshot<T, E>) -> Self {
        LoadingStateMachine {
            signal: Mutable::new(snapshot.clone()),
            feed: Mutex::new(SnapshotFeed::new(snapshot)),
        }
    }

    fn lock_feed(&self) -> MutexGuard<'_, SnapshotFeed<LoadingSnapshot<T, E>>> {
        // A snapshot is only stored once it is fully built, so a poisoned feed is still valid.
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition<F>(&self, to: LifecycleState, next: F) -> Result<(), TransitionError>
    where
        F: FnOnce(&LoadingSnapshot<T, E>) -> Result<LoadingSnapshot<T, E>, TransitionError>,
    {
        let mut feed = self.lock_feed();
        let from = feed.current().state();
        match next(feed.current()) {
            Ok(snapshot) => {
                debug!(%from, %to, "loading state transition");
                self.signal.set(snapshot.clone());
                feed.publish(snapshot);
                Ok(())
            }
            Err(error) => {
                warn!(%from, %to, %error, "loading state transition rejected");
                Err(error)
            }
        }
    }

    /// Moves to `Loading`, keeping the data of a previous success.
    pub fn start(&self) -> Result<(), TransitionError> {
        self.transition(LifecycleState::Loading, |current| match current {
            LoadingSnapshot::Loading { .. } => Err(TransitionError::illegal(
                LifecycleState::Loading,
                LifecycleState::Loading,
            )),
            other => Ok(LoadingSnapshot::loading(other.data().cloned())),
        })
    }

    /// Replaces the data of a running operation.
    pub fn update(&self, data: T) -> Result<(), TransitionError> {
        self.transition(LifecycleState::Loading, |current| {
            if current.is_loading() {
                Ok(LoadingSnapshot::loading(Some(data)))
            } else {
                Err(TransitionError::UpdateNotAllowed {
                    current: current.state(),
                    required: LifecycleState::Loading,
                })
            }
        })
    }

    pub fn succeed(&self, data: Option<T>) -> Result<(), TransitionError> {
        self.transition(LifecycleState::Success, |current| {
            if current.is_loading() {
                Ok(LoadingSnapshot::success(data))
            } else {
                Err(TransitionError::illegal(
                    current.state(),
                    LifecycleState::Success,
                ))
            }
        })
    }

    pub fn fail(&self, error: E) -> Result<(), TransitionError> {
        self.transition(LifecycleState::Error, |current| {
            if current.is_loading() {
                Ok(LoadingSnapshot::fail(error))
            } else {
                Err(TransitionError::illegal(current.state(), LifecycleState::Error))
            }
        })
    }

    /// Returns to `NotStarted`, dropping any data or error.
    pub fn reset(&self) -> Result<(), TransitionError> {
        self.transition(LifecycleState::NotStarted, |current| {
            if current.is_not_started() {
                Err(TransitionError::illegal(
                    LifecycleState::NotStarted,
                    LifecycleState::NotStarted,
                ))
            } else {
                Ok(LoadingSnapshot::NotStarted)
            }
        })
    }

    pub fn snapshot(&self) -> LoadingSnapshot<T, E> {
        self.lock_feed().current().clone()
    }

    pub fn state(&self) -> LifecycleState {
        self.lock_feed().current().state()
    }

    /// Data of the current state. Always `None` outside `Loading` and `Success`.
    pub fn data(&self) -> Option<T> {
        self.lock_feed().current().data().cloned()
    }

    /// Error of the current state. Always `None` outside `Error`.
    pub fn error(&self) -> Option<E> {
        self.lock_feed().current().error().cloned()
    }

    pub fn is_not_started(&self) -> bool {
        self.state() == LifecycleState::NotStarted
    }

    pub fn is_loading(&self) -> bool {
        self.state() == LifecycleState::Loading
    }

    pub fn is_success(&self) -> bool {
        self.state() == LifecycleState::Success
    }

    pub fn is_error(&self) -> bool {
        self.state() == LifecycleState::Error
    }

    /// Subscribes to the change feed.
    ///
    /// The returned stream yields the current snapshot first, then one snapshot per
    /// transition made after this call, without skipping any.
    pub fn subscribe(&self) -> SnapshotStream<LoadingSnapshot<T, E>> {
        self.lock_feed().subscribe()
    }

    /// Number of feed subscriptions that are still attached.
    pub fn observer_count(&self) -> usize {
        self.lock_feed().observer_count()
    }

    /// Signal of the latest snapshot. Intermediate snapshots may be skipped when the
    /// consumer polls slower than the machine changes.
    pub fn to_signal(&self) -> MutableSignalCloned<LoadingSnapshot<T, E>> {
        self.signal.signal_cloned()
    }

    /// Signal of the lifecycle state alone, emitting only when it changes.
    pub fn state_signal(&self) -> impl Signal<Item = LifecycleState> {
        self.signal.signal_ref(|snapshot| snapshot.state()).dedupe()
    }
}

impl<T: Clone, E: Clone> Default for LoadingStateMachine<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for LoadingStateMachine<T, E>
where
    T: Clone + fmt::Debug,
    E: Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingStateMachine")
            .field("snapshot", self.lock_feed().current())
            .finish()
    }
}
