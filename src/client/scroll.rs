// src/client/scroll.rs
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const SCROLL_DEBOUNCE: Duration = Duration::from_millis(70);

#[derive(Debug, Clone)]
pub struct ScrollHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ScrollHandle {
    pub fn notify(&self) {
        // the scroller may already be gone after teardown
        let _ = self.tx.send(());
    }
}

pub fn spawn_scroller<F>(delay: Duration, cancel: CancellationToken, mut on_scroll: F) -> (ScrollHandle, JoinHandle<()>)
where
    F: FnMut() + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                change = rx.recv() => {
                    if change.is_none() {
                        return;
                    }
                }
            }

            // wait for a quiet period, restarting the timer on every change
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {
                        on_scroll();
                        break;
                    }
                    change = rx.recv() => {
                        if change.is_none() {
                            on_scroll();
                            return;
                        }
                    }
                }
            }
        }
    });

    (ScrollHandle { tx }, task)
}
