use tokio::sync::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};

// Notifier lets session tasks know that the server is shutting down, and
// lets the server wait for them to finish.
#[derive(Debug)]
pub struct Notifier {
    shutdown_tx: RwLock<Option<broadcast::Sender<()>>>,
    shutdown_complete_tx: RwLock<Option<mpsc::Sender<()>>>,
    shutdown_complete_rx: Mutex<mpsc::Receiver<()>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Notifier::new()
    }
}

impl Notifier {
    pub fn new() -> Notifier {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);
        Notifier {
            shutdown_tx: RwLock::new(Some(shutdown_tx)),
            shutdown_complete_tx: RwLock::new(Some(shutdown_complete_tx)),
            shutdown_complete_rx: Mutex::new(shutdown_complete_rx),
        }
    }

    // Notifies shutdown listeners that shutdown is commencing. Listeners then
    // need to shut down gracefully and signal that they are done by simply
    // letting the Listener instance that they hold go out of scope.
    pub async fn notify(&self) {
        // When the sender is dropped, all tasks which have subscribed will
        // receive the shutdown signal and can exit.
        drop(self.shutdown_tx.write().await.take());
        // Drop the final Sender so the Receiver used in linger() completes.
        drop(self.shutdown_complete_tx.write().await.take())
    }

    // Waits for the tasks holding shutdown listeners to finish.
    pub async fn linger(&self) {
        // As the Sender held by the notifier has been dropped in notify(),
        // the only remaining Sender instances are held by session tasks. When
        // those drop, the mpsc channel closes and recv() returns None.
        let _ = self.shutdown_complete_rx.lock().await.recv().await;
    }

    pub async fn subscribe(&self) -> Listener {
        let sender_opt = self.shutdown_tx.read().await;
        let complete_sender_opt = self.shutdown_complete_tx.read().await;
        Listener {
            shutdown: sender_opt.is_none(),
            shutdown_rx: sender_opt.as_ref().map(|tx| tx.subscribe()),
            _shutdown_complete_tx: complete_sender_opt.clone(),
        }
    }
}

// Listener listens for shutdown notifications. Dropping it signals that the
// holding task is done.
#[derive(Debug)]
pub struct Listener {
    shutdown: bool,
    shutdown_rx: Option<broadcast::Receiver<()>>,
    _shutdown_complete_tx: Option<mpsc::Sender<()>>,
}

impl Listener {
    // Receives the shutdown notice, waiting if necessary.
    pub async fn listen(&mut self) {
        if self.shutdown {
            return;
        }
        match self.shutdown_rx.as_mut() {
            // Cannot receive a lag error as only one value is ever sent.
            Some(rx) => {
                let _ = rx.recv().await;
            }
            None => return,
        }
        self.shutdown = true;
    }
}
