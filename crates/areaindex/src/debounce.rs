//! Trailing-edge debounce over a channel of change events.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

/// Calls `on_fire` once per quiet window.
///
/// Every event restarts the window. Events that arrive while `on_fire` is
/// running stay queued and open a new window once it returns. When the sender
/// side is dropped, a pending window fires immediately and the loop ends.
///
/// Setting `stop` to true (or dropping its sender) ends the loop and discards
/// a pending window. A running `on_fire` is never interrupted; the loop only
/// checks `stop` between windows.
pub async fn debounce<E, F, Fut>(
    mut events: mpsc::UnboundedReceiver<E>,
    window: Duration,
    mut stop: watch::Receiver<bool>,
    mut on_fire: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut stop) => return,
            event = events.recv() => {
                if event.is_none() {
                    return;
                }
            }
        }

        let closed = loop {
            tokio::select! {
                biased;
                _ = stopped(&mut stop) => return,
                event = events.recv() => {
                    if event.is_none() {
                        break true;
                    }
                }
                _ = tokio::time::sleep(window) => break false,
            }
        };

        on_fire().await;
        if closed {
            return;
        }
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a stop.
    let _ = stop.wait_for(|stop| *stop).await;
}
