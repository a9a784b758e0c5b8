use crate::tracing_setup::tracing_init;
use futures::stream::{self, Stream, StreamExt};
use loadrx::{LoadingStateMachine, TrackLoadingExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Level};

mod tracing_setup;

fn ticker(count: u64, period: Duration) -> impl Stream<Item = Result<u64, String>> {
    stream::iter(1..=count).then(move |tick| async move {
        sleep(period).await;
        Ok(tick)
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init(Level::DEBUG)?;

    info!("==========================================");
    warn!("example: cancel with token");

    let machine = Arc::new(LoadingStateMachine::<u64, String>::new());
    let token = CancellationToken::new();
    let tracked = ticker(10, Duration::from_millis(100))
        .track_loading_by(machine.clone())
        .with_cancellation(token.clone());
    let worker = tokio::spawn(tracked.for_each(|tick| async move {
        debug!("Worker thread | tick: {:?}", tick);
    }));

    sleep(Duration::from_millis(350)).await;
    info!("  Main thread | before cancel: {:?}", machine.snapshot());
    token.cancel();
    worker.await?;
    info!("  Main thread | after cancel: {:?}", machine.snapshot());

    info!("==========================================");
    warn!("example: drop on timeout");

    let machine = Arc::new(LoadingStateMachine::<u64, String>::as_success(0));
    let collected = timeout(
        Duration::from_millis(250),
        ticker(10, Duration::from_millis(100))
            .track_loading_by(machine.clone())
            .collect::<Vec<_>>(),
    )
    .await;
    info!("  Main thread | timed out: {}", collected.is_err());
    info!("  Main thread | after timeout: {:?}", machine.snapshot());

    info!("==========================================");
    warn!("example: overlapping operations are rejected");

    let machine = Arc::new(LoadingStateMachine::<u64, String>::new());
    let first = tokio::spawn(
        ticker(3, Duration::from_millis(100))
            .track_loading_by(machine.clone())
            .collect::<Vec<_>>(),
    );
    sleep(Duration::from_millis(50)).await;
    let second: Vec<_> = ticker(3, Duration::from_millis(100))
        .track_loading_by(machine.clone())
        .collect()
        .await;
    info!("  Main thread | second operation: {:?}", second);
    info!("  Main thread | first operation: {:?}", first.await?);
    info!("  Main thread | final: {:?}", machine.snapshot());

    Ok(())
}
