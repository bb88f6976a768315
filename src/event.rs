use std::sync::Arc;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Fires the shutdown flag. Cloned into every listener task.
#[derive(Clone, Debug)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }
}

/// Cooperative stop flag checked by the scheduler between iterations.
#[derive(Clone, Debug)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the flag is set. Never resolves if every trigger is gone
    /// without firing.
    pub async fn triggered(&mut self) {
        if self.rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, Shutdown { rx })
}

/// Stop on SIGINT / Ctrl+C delivered as a signal.
pub fn spawn_signal_listener(trigger: ShutdownTrigger) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, stopping after this iteration");
                trigger.fire();
            }
            Err(err) => tracing::warn!(%err, "could not listen for ctrl-c"),
        }
    })
}

/// Stop on `q`, `Esc` or `Ctrl+C` typed while the terminal is in raw mode,
/// where Ctrl+C no longer arrives as a signal.
pub fn spawn_key_listener(trigger: ShutdownTrigger) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(event) = reader.next().await {
            match event {
                Ok(CrosstermEvent::Key(key)) if is_stop_key(&key) => {
                    trigger.fire();
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(%err, "terminal event stream closed");
                    break;
                }
            }
        }
    })
}

pub fn is_stop_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
