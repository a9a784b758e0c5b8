use crate::LifecycleState;
use thiserror::Error;

/// Raised by a [`LoadingStateMachine`](crate::LoadingStateMachine) transition that the
/// current state does not permit.
///
/// These signal a programming error, such as two operations driving one machine at
/// the same time. Correct calling code never needs to catch and retry them.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum TransitionError {
    /// The requested edge between two lifecycle states is not legal.
    #[error("Transition from {from} to {to} not allowed")]
    IllegalStateTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Data was pushed into a machine that is not loading.
    #[error("Update is only allowed during {required} state")]
    UpdateNotAllowed {
        current: LifecycleState,
        required: LifecycleState,
    },
}

impl TransitionError {
    pub(crate) fn illegal(from: LifecycleState, to: LifecycleState) -> Self {
        TransitionError::IllegalStateTransition { from, to }
    }

    /// Returns true if this error rejected an edge between two states.
    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, TransitionError::IllegalStateTransition { .. })
    }

    /// Returns true if this error rejected an `update` outside of loading.
    pub fn is_update_not_allowed(&self) -> bool {
        matches!(self, TransitionError::UpdateNotAllowed { .. })
    }

    /// The state the machine was in when the call was rejected.
    pub fn current(&self) -> LifecycleState {
        match self {
            TransitionError::IllegalStateTransition { from, .. } => *from,
            TransitionError::UpdateNotAllowed { current, .. } => *current,
        }
    }
}

/// Error item yielded by a [`TrackLoading`](crate::TrackLoading) stream.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum TrackLoadingError<E> {
    /// The source stream failed. The error is forwarded unchanged.
    #[error("{0}")]
    Source(E),

    /// The tracked machine rejected a transition.
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl<E> TrackLoadingError<E> {
    pub fn is_source(&self) -> bool {
        matches!(self, TrackLoadingError::Source(_))
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, TrackLoadingError::Transition(_))
    }

    pub fn source_error(&self) -> Option<&E> {
        match self {
            TrackLoadingError::Source(error) => Some(error),
            TrackLoadingError::Transition(_) => None,
        }
    }

    pub fn into_source(self) -> Option<E> {
        match self {
            TrackLoadingError::Source(error) => Some(error),
            TrackLoadingError::Transition(_) => None,
        }
    }
}
