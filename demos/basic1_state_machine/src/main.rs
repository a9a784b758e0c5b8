use crate::tracing_setup::tracing_init;
use futures::StreamExt;
use futures_signals::signal::SignalExt;
use loadrx::{LifecycleState, LoadingStateMachine, SnapshotStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn, Level};

mod tracing_setup;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init(Level::DEBUG)?;

    info!("==========================================");
    warn!("example: manual transitions");

    let machine = Arc::new(LoadingStateMachine::<u64, String>::new());

    let worker = machine.clone();
    let producer = tokio::spawn(async move {
        worker.start()?;
        for progress in [25, 50, 75] {
            sleep(Duration::from_millis(100)).await;
            worker.update(progress)?;
        }
        sleep(Duration::from_millis(100)).await;
        worker.succeed(Some(100))?;
        Ok::<(), loadrx::TransitionError>(())
    });

    machine
        .subscribe()
        .until_settled()
        .for_each(|snapshot| async move {
            info!("  Main thread | show snapshot: {:?}", snapshot);
        })
        .await;
    producer.await??;

    info!("==========================================");
    warn!("example: illegal transitions are rejected");

    if let Err(error) = machine.succeed(Some(1)) {
        info!("  Main thread | succeed rejected: {}", error);
    }
    machine.start()?;
    if let Err(error) = machine.start() {
        info!("  Main thread | start rejected: {}", error);
    }
    info!(
        "  Main thread | reloading keeps data: {:?}",
        machine.snapshot()
    );
    machine.fail("network down".to_string())?;
    info!("  Main thread | after fail: {:?}", machine.snapshot());

    info!("==========================================");
    warn!("example: state signal");

    let machine = Arc::new(LoadingStateMachine::<u64, String>::as_error(
        "stale".to_string(),
    ));
    let worker = machine.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        let _ = worker.reset();
    });
    machine
        .state_signal()
        .stop_if(|state| *state == LifecycleState::NotStarted)
        .for_each(|state| async move {
            info!("  Main thread | show state: {}", state);
        })
        .await;

    sleep(Duration::from_millis(100)).await;
    Ok(())
}
