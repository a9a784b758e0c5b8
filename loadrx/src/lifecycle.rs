use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The four phases an asynchronous operation moves through.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum LifecycleState {
    #[default]
    NotStarted,
    Loading,
    Success,
    Error,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::NotStarted => "notStarted",
            LifecycleState::Loading => "loading",
            LifecycleState::Success => "success",
            LifecycleState::Error => "error",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable value of a [`LoadingStateMachine`](crate::LoadingStateMachine).
///
/// Each variant carries exactly the payload that is meaningful for its state:
/// there is no error to read while loading and no data to read after a failure.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum LoadingSnapshot<T, E> {
    NotStarted,
    /// `data` holds the previous success value while reloading.
    Loading { data: Option<T> },
    Success { data: Option<T> },
    Error { error: E },
}

impl<T, E> LoadingSnapshot<T, E> {
    pub fn loading(data: Option<T>) -> Self {
        LoadingSnapshot::Loading { data }
    }

    pub fn success(data: Option<T>) -> Self {
        LoadingSnapshot::Success { data }
    }

    pub fn fail(error: E) -> Self {
        LoadingSnapshot::Error { error }
    }

    pub fn state(&self) -> LifecycleState {
        match self {
            LoadingSnapshot::NotStarted => LifecycleState::NotStarted,
            LoadingSnapshot::Loading { .. } => LifecycleState::Loading,
            LoadingSnapshot::Success { .. } => LifecycleState::Success,
            LoadingSnapshot::Error { .. } => LifecycleState::Error,
        }
    }

    pub fn is_not_started(&self) -> bool {
        matches!(self, LoadingSnapshot::NotStarted)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingSnapshot::Loading { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LoadingSnapshot::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LoadingSnapshot::Error { .. })
    }

    /// Returns true once the operation reached `Success` or `Error`.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            LoadingSnapshot::Success { .. } | LoadingSnapshot::Error { .. }
        )
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadingSnapshot::Loading { data } | LoadingSnapshot::Success { data } => {
                data.as_ref()
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            LoadingSnapshot::Error { error } => Some(error),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            LoadingSnapshot::Loading { data } | LoadingSnapshot::Success { data } => data,
            _ => None,
        }
    }

    pub fn into_error(self) -> Option<E> {
        match self {
            LoadingSnapshot::Error { error } => Some(error),
            _ => None,
        }
    }
}

impl<T, E> Default for LoadingSnapshot<T, E> {
    fn default() -> Self {
        LoadingSnapshot::NotStarted
    }
}

impl<T, E> From<&LoadingSnapshot<T, E>> for LifecycleState {
    fn from(value: &LoadingSnapshot<T, E>) -> Self {
        value.state()
    }
}
