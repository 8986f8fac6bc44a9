use tokio::sync::watch;

/// Owner side of the process shutdown switch.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

/// Cloneable handle that resolves once [`Shutdown::trigger`] is called.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn to_signal(&self) -> ShutdownSignal {
        ShutdownSignal { rx: self.tx.subscribe() }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub async fn wait(mut self) {
        // An error means the trigger was dropped, which also ends the process.
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }
}

/// Resolves on the first interrupt (Ctrl-C / SIGINT).
pub async fn interrupt() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
