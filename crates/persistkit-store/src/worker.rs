//! Background writer thread for async write jobs.
//!
//! One thread per handle, started on first use. Jobs arrive over an
//! unbounded channel and run strictly in submission order. A barrier
//! message lets callers wait until everything queued before it has run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread::{self, ThreadId};

use tokio::sync::{mpsc, oneshot};

use crate::error::Result;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Job(Job),
    Barrier(oneshot::Sender<()>),
}

struct Worker {
    tx: mpsc::UnboundedSender<Message>,
    thread: ThreadId,
}

#[derive(Default)]
pub(crate) struct AsyncWriter {
    worker: Mutex<Option<Worker>>,
}

impl AsyncWriter {
    /// Queue a job, starting the writer thread if needed.
    pub(crate) fn submit(&self, job: Job) -> Result<()> {
        self.send(Message::Job(job))
    }

    /// A receiver that resolves once every job queued so far has run.
    ///
    /// `None` if no job was ever submitted.
    pub(crate) fn barrier(&self) -> Option<oneshot::Receiver<()>> {
        let guard = self.lock();
        let worker = guard.as_ref()?;
        let (tx, rx) = oneshot::channel();
        // A closed channel means the thread is gone and nothing is pending.
        worker.tx.send(Message::Barrier(tx)).ok()?;
        Some(rx)
    }

    /// Whether the caller is running on the writer thread.
    pub(crate) fn is_writer_thread(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|w| w.thread == thread::current().id())
    }

    fn send(&self, message: Message) -> Result<()> {
        let mut guard = self.lock();
        let message = match guard.as_ref() {
            Some(worker) => match worker.tx.send(message) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        let worker = spawn()?;
        // The receiver was just created, so the send cannot fail.
        let _ = worker.tx.send(message);
        *guard = Some(worker);
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn spawn() -> Result<Worker> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let handle = thread::Builder::new()
        .name("persistkit-writer".to_string())
        .spawn(move || {
            while let Some(message) = rx.blocking_recv() {
                match message {
                    Message::Job(job) => {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::warn!("async write job panicked");
                        }
                    }
                    Message::Barrier(done) => {
                        let _ = done.send(());
                    }
                }
            }
            tracing::debug!("writer thread exiting");
        })?;
    tracing::debug!("writer thread started");
    Ok(Worker {
        tx,
        thread: handle.thread().id(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_jobs_run_in_order() {
        let writer = AsyncWriter::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..50 {
            let seen = Arc::clone(&seen);
            writer
                .submit(Box::new(move || seen.lock().unwrap().push(i)))
                .unwrap();
        }
        writer.barrier().unwrap().blocking_recv().unwrap();
        assert_eq!(*seen.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_barrier_without_jobs() {
        let writer = AsyncWriter::default();
        assert!(writer.barrier().is_none());
        assert!(!writer.is_writer_thread());
    }

    #[test]
    fn test_panicking_job_does_not_stop_writer() {
        let writer = AsyncWriter::default();
        writer.submit(Box::new(|| panic!("boom"))).unwrap();
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        writer
            .submit(Box::new(move || *flag.lock().unwrap() = true))
            .unwrap();
        writer.barrier().unwrap().blocking_recv().unwrap();
        assert!(*ran.lock().unwrap());
    }
}
