use super::store::MappingStore;
use super::StoreError;
use crate::mapping::MappingRecord;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{channel, Sender};
use tokio::sync::oneshot;
use tracing::{debug, error, info};

macro_rules! handle_action {
    ($action:expr, $response_tx:expr) => {
        if $response_tx.send($action).is_err() {
            error!("Failed to send response");
        }
    };
}

pub struct PersistenceManager {
    tx: Sender<StoreAction>,
    worker_handle: tokio::task::JoinHandle<()>,
}

impl PersistenceManager {
    /// Moves `store` into a worker on the blocking pool, since stores do
    /// synchronous file I/O. All access goes through the channel.
    pub fn spawn<S>(mut store: S) -> Self
    where
        S: MappingStore + Send + 'static,
    {
        let (tx, mut rx) = channel::<StoreAction>(32);
        let handle = tokio::task::spawn_blocking(move || {
            while let Some(action) = rx.blocking_recv() {
                match action {
                    StoreAction::SaveMapping { record, response_tx } => {
                        debug!("Saving mapping '{}'", record.key);
                        handle_action!(store.set(record), response_tx);
                    }
                    StoreAction::LoadMappings { response_tx } => {
                        handle_action!(Ok(store.all()), response_tx);
                    }
                }
            }
            info!("Persistence worker stopped");
        });

        Self {
            tx,
            worker_handle: handle,
        }
    }

    pub fn get_sender(&self) -> Sender<StoreAction> {
        self.tx.clone()
    }

    pub async fn load_mappings(&self) -> Result<Vec<MappingRecord>, StoreError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(StoreAction::LoadMappings { response_tx })
            .await
            .map_err(|_| StoreError::WorkerGone)?;
        response_rx.await.map_err(|_| StoreError::WorkerGone)?
    }

    /// Queues a save without waiting; the outcome is logged.
    pub fn save_mapping(&self, record: MappingRecord) -> Result<(), StoreError> {
        let key = record.key.clone();
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .try_send(StoreAction::SaveMapping { record, response_tx })
            .map_err(|e| match e {
                TrySendError::Full(_) => StoreError::QueueFull,
                TrySendError::Closed(_) => StoreError::WorkerGone,
            })?;

        tokio::spawn(async move {
            match response_rx.await {
                Ok(Ok(())) => info!("Mapping '{}' saved", key),
                Ok(Err(e)) => error!("Failed to save mapping '{}': {}", key, e),
                Err(_) => error!("Persistence worker dropped save of '{}'", key),
            }
        });
        Ok(())
    }

    /// Closes the channel and waits for queued actions to finish.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!("Persistence worker panicked: {}", e);
        }
    }
}

// Actions for the persistence worker
#[derive(Debug)]
pub enum StoreAction {
    SaveMapping {
        record: MappingRecord,
        response_tx: oneshot::Sender<Result<(), StoreError>>,
    },
    LoadMappings {
        response_tx: oneshot::Sender<Result<Vec<MappingRecord>, StoreError>>,
    },
}
