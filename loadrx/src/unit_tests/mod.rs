use crate::{LoadingSnapshot, SnapshotStream};

mod track_loading_test;

pub type TestSnapshot = LoadingSnapshot<i32, String>;

/// Collects every snapshot already queued on `feed`, without waiting.
pub fn drain<V>(feed: &mut SnapshotStream<V>) -> Vec<V> {
    std::iter::from_fn(|| feed.try_next()).collect()
}
