//! # Observable Use Cases
//!
//! Use cases that keep publishing after the first result, e.g. forwarding
//! every change of a stored preference.
//!
//! Unlike [`UseCaseExecutor`](super::executor::UseCaseExecutor), which hands
//! out a fresh stream per invocation, an [`ObservableExecutor`] owns one
//! shared conflated channel for its whole lifetime. Every `invoke` and every
//! `observe` attaches to that same channel, so an observer that shows up late
//! gets the latest `Success` straight away instead of a new `Loading`.

use std::any::type_name;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, info, trace};
use tokio::runtime::Handle;

use super::conflated::ConflatedSender;
use super::executor::ResultStream;
use super::jobs::JobGroup;
use super::result::{BoxError, UseCaseError, UseCaseResult};

/// Shared result channel an observable use case publishes into.
pub type ResultSender<R> = ConflatedSender<UseCaseResult<R>>;

#[async_trait]
pub trait ObservableUseCase: Send + Sync + 'static {
    type Param: fmt::Debug + Send + 'static;
    type Output: fmt::Debug + Clone + Send + Sync + 'static;

    /// Publishes any number of results into `result`. May run for as long as
    /// the upstream source stays open. Called on the executor's worker runtime.
    async fn execute(
        &self,
        param: Self::Param,
        result: &ResultSender<Self::Output>,
    ) -> Result<(), BoxError>;
}

pub struct ObservableExecutor<U: ObservableUseCase> {
    use_case: Arc<U>,
    runtime: Handle,
    jobs: JobGroup,
    result: Arc<ResultSender<U::Output>>,
}

impl<U: ObservableUseCase> ObservableExecutor<U> {
    pub fn new(use_case: U, runtime: Handle) -> Self {
        Self::from_arc(Arc::new(use_case), runtime)
    }

    pub fn from_arc(use_case: Arc<U>, runtime: Handle) -> Self {
        Self {
            use_case,
            runtime,
            jobs: JobGroup::new(),
            result: Arc::new(ConflatedSender::new()),
        }
    }

    pub fn use_case(&self) -> &Arc<U> {
        &self.use_case
    }

    /// Attaches to the shared result stream without starting anything.
    pub fn observe(&self) -> ResultStream<U::Output> {
        self.result.subscribe()
    }

    /// Latest published result, if any.
    pub fn latest(&self) -> Option<UseCaseResult<U::Output>> {
        self.result.latest()
    }

    /// Execute with the given param and return the shared result stream.
    /// Can be called from any thread.
    pub fn invoke(&self, param: U::Param) -> ResultStream<U::Output> {
        let stream = self.observe();
        self.invoke_detached(param);
        stream
    }

    /// Execute without attaching a new observer.
    pub fn invoke_detached(&self, param: U::Param) {
        trace!("Executing {} with parameter {:?}", type_name::<U>(), param);
        let use_case = Arc::clone(&self.use_case);
        let result = Arc::clone(&self.result);
        self.jobs.spawn(&self.runtime, async move {
            // Observers that already saw a value must not regress to Loading.
            result.offer_if_empty(UseCaseResult::Loading);

            let outcome = AssertUnwindSafe(use_case.execute(param, &result))
                .catch_unwind()
                .await;
            let cause = match outcome {
                Ok(Ok(())) => {
                    trace!("{} execution returned", type_name::<U>());
                    return;
                }
                Ok(Err(e)) => UseCaseError::new(e),
                Err(payload) => UseCaseError::from_panic(payload),
            };
            info!("Use case {} execution failed: {}", type_name::<U>(), cause);
            result.offer(UseCaseResult::Error(cause));
        });
    }

    /// Cancel all ongoing jobs, including live upstream subscriptions.
    /// Observers stay attached and keep the last published value.
    pub fn cancel_all(&self) {
        let cancelled = self.jobs.cancel_all();
        debug!("{}: cancel_all aborted {} job(s)", type_name::<U>(), cancelled);
    }

    pub fn active_jobs(&self) -> usize {
        self.jobs.active()
    }
}

impl<U: ObservableUseCase<Param = ()>> ObservableExecutor<U> {
    pub fn invoke_unit(&self) -> ResultStream<U::Output> {
        self.invoke(())
    }
}
