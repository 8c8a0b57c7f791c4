use std::sync::Arc;

use async_trait::async_trait;
use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};
use rayon::ThreadPoolBuilder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HashWorkerError {
  #[error("Bcrypt error: {0}")]
  Bcrypt(#[from] BcryptError),
  #[error("Thread pool build error: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
  #[error("Channel send error")]
  Send,
  #[error("Channel receive error")]
  Receive,
}

enum WorkOrder {
  Hash(String, flume::Sender<Result<String, HashWorkerError>>),
  Verify(String, String, flume::Sender<Result<bool, HashWorkerError>>),
}

/// Runs bcrypt on a dedicated rayon pool so the CPU cost never lands on an
/// async executor thread and never holds a shared lock.
pub struct HashWorker {
  sender: flume::Sender<WorkOrder>,
}

impl HashWorker {
  pub fn new(num_threads: usize) -> Result<Self, HashWorkerError> {
    Self::with_cost(num_threads, DEFAULT_COST)
  }

  /// Lowered cost is for tests only; production callers go through `new`.
  pub fn with_cost(
    num_threads: usize,
    cost: u32,
  ) -> Result<Self, HashWorkerError> {
    let thread_pool =
      ThreadPoolBuilder::new().num_threads(num_threads).build()?;
    // Each hashing operation takes on the order of a second, so the channel
    // capacity allows roughly 3 seconds' worth of requests to queue.
    let channels_capacity = num_threads * 3;
    let (tx, rx) = flume::bounded::<WorkOrder>(channels_capacity);
    let rx = Arc::new(rx);

    for _ in 0..num_threads {
      // Dispatch the run-loop.
      thread_pool.spawn({
        let arc_rx = Arc::clone(&rx);
        move || {
          while let Ok(work_order) = arc_rx.recv() {
            match work_order {
              WorkOrder::Hash(password, response) => {
                let _ = response
                  .send(hash(password, cost).map_err(HashWorkerError::from));
              }
              WorkOrder::Verify(password, hashed_password, response) => {
                // A malformed hash is a mismatch, not an error.
                let _ = response
                  .send(Ok(verify(password, &hashed_password).unwrap_or(false)));
              }
            };
          }
        }
      });
    }

    Ok(Self { sender: tx })
  }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Hasher: Send + Sync {
  async fn hash_password(
    &self,
    password: &str,
  ) -> Result<String, HashWorkerError>;
  async fn verify_password(
    &self,
    password: &str,
    hash: &str,
  ) -> Result<bool, HashWorkerError>;
}

#[async_trait]
impl Hasher for HashWorker {
  async fn hash_password(
    &self,
    password: &str,
  ) -> Result<String, HashWorkerError> {
    let (response_tx, response_rx) = flume::bounded(1);
    self
      .sender
      .send_async(WorkOrder::Hash(password.to_string(), response_tx))
      .await
      .map_err(|_| HashWorkerError::Send)?;

    response_rx
      .recv_async()
      .await
      .map_err(|_| HashWorkerError::Receive)?
  }

  async fn verify_password(
    &self,
    password: &str,
    hash: &str,
  ) -> Result<bool, HashWorkerError> {
    let (response_tx, response_rx) = flume::bounded(1);
    self
      .sender
      .send_async(WorkOrder::Verify(
        password.to_string(),
        hash.to_string(),
        response_tx,
      ))
      .await
      .map_err(|_| HashWorkerError::Send)?;

    response_rx
      .recv_async()
      .await
      .map_err(|_| HashWorkerError::Receive)?
  }
}
