use super::{drain, TestSnapshot};
use crate::{
    LifecycleState, LoadingStateMachine, TrackLoadingError, TrackLoadingExt, TransitionError,
};
use futures::channel::mpsc;
use futures::stream::{self, FusedStream, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type TestMachine = LoadingStateMachine<i32, String>;

fn busy() -> TrackLoadingError<String> {
    TrackLoadingError::Transition(TransitionError::IllegalStateTransition {
        from: LifecycleState::Loading,
        to: LifecycleState::Loading,
    })
}

// Test every value updates the machine and completion settles it
#[tokio::test]
async fn test_track_loading_completes() {
    let machine = Arc::new(TestMachine::new());
    let mut feed = machine.subscribe();
    drain(&mut feed);

    let values: Vec<_> = stream::iter(vec![Ok(1), Ok(2), Ok(3), Ok(4)])
        .track_loading_by(machine.clone())
        .collect()
        .await;

    assert_eq!(values, vec![Ok(1), Ok(2), Ok(3), Ok(4)]);
    assert_eq!(
        drain(&mut feed),
        vec![
            TestSnapshot::loading(None),
            TestSnapshot::loading(Some(1)),
            TestSnapshot::loading(Some(2)),
            TestSnapshot::loading(Some(3)),
            TestSnapshot::loading(Some(4)),
            TestSnapshot::success(Some(4)),
        ]
    );
    assert!(machine.is_success());
    assert_eq!(machine.data(), Some(4));
}

// Test an empty source succeeds without data
#[tokio::test]
async fn test_track_loading_empty_source() {
    let machine = Arc::new(TestMachine::new());
    let values: Vec<_> = stream::iter(Vec::<Result<i32, String>>::new())
        .track_loading_by(machine.clone())
        .collect()
        .await;

    assert!(values.is_empty());
    assert_eq!(machine.snapshot(), TestSnapshot::success(None));
}

// Test a source error fails the machine and is forwarded
#[tokio::test]
async fn test_track_loading_source_error() {
    let machine = Arc::new(TestMachine::new());
    let mut feed = machine.subscribe();
    drain(&mut feed);

    let values: Vec<_> = stream::iter(vec![Err::<i32, _>("E".to_string())])
        .track_loading_by(machine.clone())
        .collect()
        .await;

    assert_eq!(values, vec![Err(TrackLoadingError::Source("E".to_string()))]);
    assert_eq!(
        drain(&mut feed),
        vec![TestSnapshot::loading(None), TestSnapshot::fail("E".to_string())]
    );
    assert_eq!(machine.error(), Some("E".to_string()));
    assert_eq!(machine.data(), None);
}

// Test nothing is forwarded after the source failed
#[tokio::test]
async fn test_track_loading_stops_after_error() {
    let machine = Arc::new(TestMachine::new());
    let values: Vec<_> = stream::iter(vec![Ok(1), Err("E".to_string()), Ok(2)])
        .track_loading_by(machine.clone())
        .collect()
        .await;

    assert_eq!(
        values,
        vec![Ok(1), Err(TrackLoadingError::Source("E".to_string()))]
    );
    assert!(machine.is_error());
}

// Test the mapper feeds the machine while the original values go downstream
#[tokio::test]
async fn test_track_loading_with_mapper() {
    let machine = Arc::new(TestMachine::new());
    let mut feed = machine.subscribe();
    drain(&mut feed);

    let values: Vec<_> = stream::iter(vec!["1", "2", "3", "4"].into_iter().map(Ok::<_, String>))
        .track_loading_by_mapped(machine.clone(), |value: &&str| {
            value.parse::<i32>().unwrap_or_default() * 2
        })
        .collect()
        .await;

    assert_eq!(values, vec![Ok("1"), Ok("2"), Ok("3"), Ok("4")]);
    assert_eq!(
        drain(&mut feed),
        vec![
            TestSnapshot::loading(None),
            TestSnapshot::loading(Some(2)),
            TestSnapshot::loading(Some(4)),
            TestSnapshot::loading(Some(6)),
            TestSnapshot::loading(Some(8)),
            TestSnapshot::success(Some(8)),
        ]
    );
}

// Test reloading keeps the previous data until new values arrive
#[tokio::test]
async fn test_track_loading_reload_keeps_data() {
    let machine = Arc::new(TestMachine::as_success(7));
    let mut feed = machine.subscribe();
    drain(&mut feed);

    let (tx, rx) = mpsc::unbounded::<Result<i32, String>>();
    let mut tracked = rx.track_loading_by(machine.clone());
    tx.unbounded_send(Ok(8)).unwrap();
    assert_eq!(tracked.next().await, Some(Ok(8)));
    drop(tx);
    assert_eq!(tracked.next().await, None);

    assert_eq!(
        drain(&mut feed),
        vec![
            TestSnapshot::loading(Some(7)),
            TestSnapshot::loading(Some(8)),
            TestSnapshot::success(Some(8)),
        ]
    );
}

// Test dropping the stream mid-flight releases the source and resets the machine
#[tokio::test]
async fn test_track_loading_cancel_resets() {
    let machine = Arc::new(TestMachine::new());
    let mut feed = machine.subscribe();
    drain(&mut feed);

    let (tx, rx) = mpsc::unbounded::<Result<i32, String>>();
    let mut tracked = rx.track_loading_by(machine.clone());
    tx.unbounded_send(Ok(1)).unwrap();
    assert_eq!(tracked.next().await, Some(Ok(1)));
    assert!(machine.is_loading());

    drop(tracked);
    assert!(machine.is_not_started());
    assert!(tx.is_closed());
    assert!(tx.unbounded_send(Ok(2)).is_err());
    assert_eq!(
        drain(&mut feed),
        vec![
            TestSnapshot::loading(None),
            TestSnapshot::loading(Some(1)),
            TestSnapshot::NotStarted,
        ]
    );
}

// Test a stream that was never polled leaves the machine alone
#[tokio::test]
async fn test_track_loading_not_polled() {
    let machine = Arc::new(TestMachine::as_error("old".to_string()));
    let tracked = stream::iter(vec![Ok(1)]).track_loading_by(machine.clone());
    drop(tracked);
    assert_eq!(machine.snapshot(), TestSnapshot::fail("old".to_string()));
}

// Test dropping a settled stream never resets a machine restarted by someone else
#[tokio::test]
async fn test_track_loading_drop_after_settle() {
    let machine = Arc::new(TestMachine::new());
    let mut tracked = stream::iter(vec![Ok(1)]).track_loading_by(machine.clone());
    assert_eq!(tracked.next().await, Some(Ok(1)));
    assert_eq!(tracked.next().await, None);
    assert!(tracked.is_terminated());
    assert!(machine.is_success());

    machine.start().unwrap();
    drop(tracked);
    assert_eq!(machine.snapshot(), TestSnapshot::loading(Some(1)));
}

// Test a second operation on a busy machine is rejected at subscription
#[tokio::test]
async fn test_track_loading_rejects_busy_machine() {
    let machine = Arc::new(TestMachine::new());
    let (tx, rx) = mpsc::unbounded::<Result<i32, String>>();
    let mut first = rx.track_loading_by(machine.clone());
    tx.unbounded_send(Ok(1)).unwrap();
    assert_eq!(first.next().await, Some(Ok(1)));

    let (other_tx, other_rx) = mpsc::unbounded::<Result<i32, String>>();
    other_tx.unbounded_send(Ok(10)).unwrap();
    let mut second = other_rx.track_loading_by(machine.clone());
    assert_eq!(second.next().await, Some(Err(busy())));
    assert_eq!(second.next().await, None);
    assert!(other_tx.is_closed());

    drop(second);
    assert_eq!(machine.snapshot(), TestSnapshot::loading(Some(1)));

    drop(tx);
    assert_eq!(first.next().await, None);
    assert_eq!(machine.snapshot(), TestSnapshot::success(Some(1)));
}

// Test a transition rejected mid-flight ends the stream
#[tokio::test]
async fn test_track_loading_external_reset() {
    let machine = Arc::new(TestMachine::new());
    let (tx, rx) = mpsc::unbounded::<Result<i32, String>>();
    let mut tracked = rx.track_loading_by(machine.clone());
    tx.unbounded_send(Ok(1)).unwrap();
    assert_eq!(tracked.next().await, Some(Ok(1)));

    machine.reset().unwrap();
    tx.unbounded_send(Ok(2)).unwrap();
    assert_eq!(
        tracked.next().await,
        Some(Err(TrackLoadingError::Transition(
            TransitionError::UpdateNotAllowed {
                current: LifecycleState::NotStarted,
                required: LifecycleState::Loading,
            }
        )))
    );
    assert_eq!(tracked.next().await, None);
    assert!(tx.is_closed());
    assert!(machine.is_not_started());
}

// Test a failed operation can be retried with a new stream
#[tokio::test]
async fn test_track_loading_retry() {
    let machine = Arc::new(TestMachine::new());
    let attempt = |fail: bool| {
        let item = if fail { Err("E".to_string()) } else { Ok(5) };
        stream::iter(vec![item]).track_loading_by(machine.clone())
    };

    let first: Vec<_> = attempt(true).collect().await;
    assert_eq!(first, vec![Err(TrackLoadingError::Source("E".to_string()))]);
    assert!(machine.is_error());

    let second: Vec<_> = attempt(false).collect().await;
    assert_eq!(second, vec![Ok(5)]);
    assert_eq!(machine.snapshot(), TestSnapshot::success(Some(5)));
}

// Test a cancellation token ends the stream and resets the machine
#[tokio::test]
async fn test_track_loading_with_cancellation() {
    let machine = Arc::new(TestMachine::new());
    let token = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded::<Result<i32, String>>();
    let mut tracked = rx
        .track_loading_by(machine.clone())
        .with_cancellation(token.clone());

    tx.unbounded_send(Ok(1)).unwrap();
    assert_eq!(tracked.next().await, Some(Ok(1)));

    token.cancel();
    assert_eq!(tracked.next().await, None);
    assert!(tracked.is_terminated());
    assert!(machine.is_not_started());
    assert!(tx.is_closed());
}

// Test a token cancelled before the first poll never starts the machine
#[tokio::test]
async fn test_track_loading_cancelled_before_start() {
    let machine = Arc::new(TestMachine::as_success(3));
    let token = CancellationToken::new();
    token.cancel();

    let values: Vec<_> = stream::iter(vec![Ok(1)])
        .track_loading_by(machine.clone())
        .with_cancellation(token)
        .collect()
        .await;

    assert!(values.is_empty());
    assert_eq!(machine.snapshot(), TestSnapshot::success(Some(3)));
}

// Test cancellation wakes a stream waiting on its source
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_track_loading_cancel_while_pending() {
    let machine = Arc::new(TestMachine::new());
    let token = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded::<Result<i32, String>>();
    let tracked = rx
        .track_loading_by(machine.clone())
        .with_cancellation(token.clone());

    let handle = tokio::spawn(async move { tracked.collect::<Vec<_>>().await });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    token.cancel();

    let values = handle.await.unwrap();
    assert!(values.is_empty());
    assert!(machine.is_not_started());
    assert!(tx.is_closed());
}

// Test a panicking mapper unwinds through the stream and resets the machine
#[test]
fn test_track_loading_mapper_panic() {
    let machine = Arc::new(TestMachine::new());
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        futures::executor::block_on(
            stream::iter(vec![Ok::<_, String>(1), Ok(2)])
                .track_loading_by_mapped(machine.clone(), |value: &i32| {
                    if *value == 2 {
                        panic!("mapper failed");
                    }
                    *value
                })
                .collect::<Vec<_>>(),
        )
    }));

    assert!(result.is_err());
    assert!(machine.is_not_started());
}
