use crate::tracing_setup::tracing_init;
use futures::stream::{self, Stream, StreamExt};
use loadrx::{LoadingStateMachine, SnapshotStreamExt, TrackLoadingExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn, Level};

mod tracing_setup;

#[derive(Debug, Clone, PartialEq)]
struct Chunk {
    index: usize,
    bytes: u64,
}

fn fetch_chunks(count: usize, fail_at: Option<usize>) -> impl Stream<Item = Result<Chunk, String>> {
    stream::iter(0..count).then(move |index| async move {
        sleep(Duration::from_millis(150)).await;
        if fail_at == Some(index) {
            Err(format!("chunk {index} timed out"))
        } else {
            Ok(Chunk {
                index,
                bytes: 512 * (index as u64 + 1),
            })
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_init(Level::DEBUG)?;

    info!("==========================================");
    warn!("example: track loading by");

    let machine = Arc::new(LoadingStateMachine::<Chunk, String>::new());
    let observer = tokio::spawn(machine.subscribe().until_settled().for_each(
        |snapshot| async move {
            info!("  Main thread | show snapshot: {:?}", snapshot);
        },
    ));
    fetch_chunks(4, None)
        .track_loading_by(machine.clone())
        .for_each(|chunk| async move {
            debug!("Worker thread | received: {:?}", chunk);
        })
        .await;
    observer.await?;

    info!("==========================================");
    warn!("example: track loading by mapped, reloading keeps data");

    let machine = Arc::new(LoadingStateMachine::<String, String>::as_success(
        "cached".to_string(),
    ));
    let observer = tokio::spawn(machine.subscribe().skip(1).until_settled().for_each(
        |snapshot| async move {
            info!("  Main thread | show snapshot: {:?}", snapshot);
        },
    ));
    fetch_chunks(3, None)
        .track_loading_by_mapped(machine.clone(), |chunk: &Chunk| {
            format!("{} of 3 chunks", chunk.index + 1)
        })
        .for_each(|chunk| async move {
            debug!("Worker thread | received: {:?}", chunk);
        })
        .await;
    observer.await?;

    info!("==========================================");
    warn!("example: track loading by with source error");

    let machine = Arc::new(LoadingStateMachine::<Chunk, String>::new());
    let observer = tokio::spawn(machine.subscribe().until_settled().for_each(
        |snapshot| async move {
            info!("  Main thread | show snapshot: {:?}", snapshot);
        },
    ));
    let items: Vec<_> = fetch_chunks(4, Some(2))
        .track_loading_by(machine.clone())
        .collect()
        .await;
    observer.await?;
    info!("  Main thread | forwarded items: {:?}", items);
    info!("  Main thread | machine error: {:?}", machine.error());

    sleep(Duration::from_millis(100)).await;
    Ok(())
}
