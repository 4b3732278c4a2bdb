use anyhow::anyhow;
use std::future::Future;
use tokio::sync::mpsc;

/// Write side of a subscriber's transport.
///
/// A failed `send` ends the session; there is no retry.
pub trait PayloadSink: Send {
    fn send(&mut self, payload: Vec<u8>) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Resolves once the peer is known to be gone, so an idle session can end
    /// without waiting for its next write. Transports that cannot tell never resolve.
    fn closed(&mut self) -> impl Future<Output = ()> + Send {
        std::future::pending()
    }
}

/// In-process subscriber fed through a bounded channel
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<u8>>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl PayloadSink for ChannelSink {
    async fn send(&mut self, payload: Vec<u8>) -> anyhow::Result<()> {
        self.tx
            .send(payload)
            .await
            .map_err(|_| anyhow!("subscriber channel closed"))
    }

    async fn closed(&mut self) {
        self.tx.closed().await
    }
}
