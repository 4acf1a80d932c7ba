//! # Use Case Executor
//!
//! Runs a [`UseCase`] on a worker runtime and reports its progress:
//!
//! ```text
//! invoke(param)
//!   │
//!   ├─► sink.offer(Loading)
//!   ├─► use_case.execute(param)      (worker runtime, never the caller's thread)
//!   └─► sink.offer(Success(value))   or   sink.offer(Error(cause))
//! ```
//!
//! Failures and panics inside `execute` never reach the caller; they become
//! `Error`. A job aborted through [`UseCaseExecutor::cancel_all`] emits
//! nothing further and its sink is dropped, which ends the stream.

use std::any::type_name;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, info, trace, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::conflated::{self, ConflatedReceiver, ConflatedSender};
use super::jobs::JobGroup;
use super::result::{BoxError, UseCaseError, UseCaseResult};

/// A single unit of business logic.
#[async_trait]
pub trait UseCase: Send + Sync + 'static {
    type Param: fmt::Debug + Send + 'static;
    type Output: fmt::Debug + Clone + Send + Sync + 'static;

    /// Core logic. Always called on the executor's worker runtime.
    async fn execute(&self, param: Self::Param) -> Result<Self::Output, BoxError>;
}

/// Stream of results returned by [`UseCaseExecutor::invoke`].
pub type ResultStream<R> = ConflatedReceiver<UseCaseResult<R>>;

/// Where results get posted. Offering must never block the producer.
pub trait ResultSink<T>: Send + 'static {
    fn offer(&self, value: T);
}

impl<T: Clone + Send + Sync + 'static> ResultSink<T> for ConflatedSender<T> {
    fn offer(&self, value: T) {
        ConflatedSender::offer(self, value);
    }
}

impl<T: Send + 'static> ResultSink<T> for mpsc::Sender<T> {
    /// Drops the value if the channel is full or closed.
    fn offer(&self, value: T) {
        if let Err(e) = self.try_send(value) {
            debug!("Dropped result: {}", e);
        }
    }
}

impl<T: Send + 'static> ResultSink<T> for mpsc::UnboundedSender<T> {
    fn offer(&self, value: T) {
        if self.send(value).is_err() {
            debug!("Dropped result: receiver closed");
        }
    }
}

/// Returned by [`UseCaseExecutor::execute_now`] when the job was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "use case execution was cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Executes business logic asynchronously on a worker runtime.
pub struct UseCaseExecutor<U: UseCase> {
    use_case: Arc<U>,
    runtime: Handle,
    jobs: JobGroup,
}

impl<U: UseCase> UseCaseExecutor<U> {
    /// `runtime` is where [`UseCase::execute`] will be called.
    pub fn new(use_case: U, runtime: Handle) -> Self {
        Self::from_arc(Arc::new(use_case), runtime)
    }

    pub fn from_arc(use_case: Arc<U>, runtime: Handle) -> Self {
        Self {
            use_case,
            runtime,
            jobs: JobGroup::new(),
        }
    }

    /// Execute with the given param. Can be called from any thread.
    /// Returns a conflated stream where the results will be posted.
    pub fn invoke(&self, param: U::Param) -> ResultStream<U::Output> {
        let (sender, receiver) = conflated::channel();
        self.invoke_with(param, sender);
        receiver
    }

    /// Execute with the given param, posting results into `sink`.
    /// Returns without waiting for the job to finish.
    pub fn invoke_with<S>(&self, param: U::Param, sink: S)
    where
        S: ResultSink<UseCaseResult<U::Output>>,
    {
        trace!("Executing {} with parameter {:?}", type_name::<U>(), param);
        let use_case = Arc::clone(&self.use_case);
        self.jobs.spawn(&self.runtime, async move {
            sink.offer(UseCaseResult::Loading);
            match run_guarded(use_case.as_ref(), param).await {
                Ok(value) => {
                    trace!("Execution was successful, returned {:?}", value);
                    sink.offer(UseCaseResult::Success(value));
                }
                Err(cause) => {
                    info!("Use case {} execution failed: {}", type_name::<U>(), cause);
                    sink.offer(UseCaseResult::Error(cause));
                }
            }
        });
    }

    /// Execute and wait for the outcome. Never returns `Loading`.
    pub async fn execute_now(
        &self,
        param: U::Param,
    ) -> Result<UseCaseResult<U::Output>, Cancelled> {
        trace!("Executing {} now with parameter {:?}", type_name::<U>(), param);
        let use_case = Arc::clone(&self.use_case);
        let task = self.jobs.spawn(&self.runtime, async move {
            run_guarded(use_case.as_ref(), param).await
        });

        match task.await {
            Ok(Ok(value)) => Ok(UseCaseResult::Success(value)),
            Ok(Err(cause)) => {
                info!("Use case {} execution failed: {}", type_name::<U>(), cause);
                Ok(UseCaseResult::Error(cause))
            }
            Err(e) if e.is_cancelled() => {
                debug!("Use case {} was cancelled", type_name::<U>());
                Err(Cancelled)
            }
            Err(e) => {
                // run_guarded already catches panics, so this is the runtime reporting one.
                warn!("Use case {} task failed: {}", type_name::<U>(), e);
                Ok(UseCaseResult::Error(UseCaseError::from_panic(e.into_panic())))
            }
        }
    }

    /// Cancel all ongoing jobs. New invocations keep working afterwards.
    pub fn cancel_all(&self) {
        let cancelled = self.jobs.cancel_all();
        debug!("{}: cancel_all aborted {} job(s)", type_name::<U>(), cancelled);
    }

    /// Number of jobs still running.
    pub fn active_jobs(&self) -> usize {
        self.jobs.active()
    }
}

impl<U: UseCase<Param = ()>> UseCaseExecutor<U> {
    pub fn invoke_unit(&self) -> ResultStream<U::Output> {
        self.invoke(())
    }

    pub async fn execute_now_unit(&self) -> Result<UseCaseResult<U::Output>, Cancelled> {
        self.execute_now(()).await
    }
}

/// Runs the use case, turning both returned errors and panics into [`UseCaseError`].
async fn run_guarded<U: UseCase>(use_case: &U, param: U::Param) -> Result<U::Output, UseCaseError> {
    match AssertUnwindSafe(use_case.execute(param)).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(UseCaseError::new(e)),
        Err(payload) => Err(UseCaseError::from_panic(payload)),
    }
}
