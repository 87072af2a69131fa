//! Bounded job queue and the fixed pool of workers draining it.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;

use crate::server::connection::Connection;
use crate::server::error::Error;
use crate::server::handler::JobHandler;

/// Producer side of the job queue, held by the listener.
pub type JobSender = mpsc::Sender<Connection>;

/// Consumer side of the job queue, shared by every worker.
///
/// The receiver sits behind an async mutex: whichever worker holds the lock
/// waits for the next connection, the others queue up on the lock. Each
/// connection is therefore handed to exactly one worker, in arrival order.
#[derive(Clone)]
pub struct JobReceiver {
    inner: Arc<Mutex<mpsc::Receiver<Connection>>>,
}

impl JobReceiver {
    /// Wait for the next connection. `None` once the sender is gone and the
    /// queue is drained.
    pub async fn next(&self) -> Option<Connection> {
        self.inner.lock().await.recv().await
    }
}

/// Create a job queue holding at most `capacity` accepted connections.
///
/// Sending into a full queue waits, which is what stalls the accept loop
/// under overload.
pub fn job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let receiver = JobReceiver {
        inner: Arc::new(Mutex::new(receiver)),
    };
    (sender, receiver)
}

/// A fixed set of symmetric workers.
pub struct WorkerPool {
    workers: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    /// Start `count` workers pulling from `queue` and running `handler`.
    pub fn spawn(count: usize, queue: JobReceiver, handler: JobHandler) -> Result<Self, Error> {
        if count == 0 {
            return Err(Error::InvalidConfig("Worker pool size is zero".to_string()));
        }

        let mut workers = JoinSet::new();
        for id in 0..count {
            workers.spawn(run_worker(id, queue.clone(), Arc::clone(&handler)));
        }
        debug!("Spawned {count} workers");

        Ok(Self { workers, size: count })
    }

    /// Number of workers the pool was started with.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Wait for the workers to exit once the queue has been closed.
    ///
    /// Workers finish the connections already queued. Any still running
    /// after `grace` are aborted together with the connection they serve.
    pub async fn shutdown(mut self, grace: Duration) {
        info!("Waiting for {len} workers to finish...", len = self.workers.len());
        let drained = timeout(grace, async {
            while let Some(res) = self.workers.join_next().await {
                if let Err(e) = res {
                    error!("Worker failed during shutdown: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Workers still busy after {grace:?}, aborting them");
            self.workers.abort_all();
            while self.workers.join_next().await.is_some() {}
        }
    }
}

/// Aborts the wrapped task when dropped, so cancelling a worker also
/// cancels the connection it is waiting on.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run_worker(id: usize, queue: JobReceiver, handler: JobHandler) {
    debug!("Worker {id} started");

    while let Some(connection) = queue.next().await {
        let peer = connection.peer;

        // Run the job in its own task so a panic stays with this connection.
        let mut job = AbortOnDrop(tokio::spawn((handler)(connection)));
        match (&mut job.0).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Worker {id}: error handling connection from {peer}: {e}"),
            Err(e) if e.is_panic() => error!("Worker {id}: handler panicked on connection from {peer}"),
            Err(e) => error!("Worker {id}: connection from {peer} was cancelled: {e}"),
        }
    }

    debug!("Worker {id} shutting down");
}
