//! # Core Execution Model
//!
//! Everything a use case needs to run asynchronously and report back.
//! Apart from [`config`], nothing here knows about preferences or the CLI.
//!
//! ```text
//!   caller (any thread)
//!        │ invoke(param)
//!        ▼
//!   ┌──────────────────────┐   spawn    ┌───────────────────────────┐
//!   │  UseCaseExecutor /   │ ─────────► │  worker runtime (Handle)  │
//!   │  ObservableExecutor  │            │  Loading → execute() →    │
//!   │  (JobGroup)          │ ◄─ abort ─ │  Success | Error          │
//!   └──────────────────────┘            └─────────────┬─────────────┘
//!                                                     │ offer (never blocks)
//!                                                     ▼
//!                                      ConflatedReceiver<UseCaseResult<R>>
//!                                        (any number of observers)
//! ```
//!
//! ## Modules
//!
//! - [`result`]: `UseCaseResult` tri-state and `UseCaseError`
//! - [`conflated`]: single-slot, multi-reader broadcast channel
//! - [`jobs`]: cancellable group of spawned tasks
//! - [`executor`]: `UseCase` trait and its one-shot executor
//! - [`observable`]: long-lived use cases with a shared result stream
//! - [`config`]: configuration loading and resolution

pub mod config;
pub mod conflated;
pub mod executor;
pub mod jobs;
pub mod observable;
pub mod result;

pub use conflated::{ConflatedReceiver, ConflatedSender};
pub use executor::{Cancelled, ResultSink, ResultStream, UseCase, UseCaseExecutor};
pub use observable::{ObservableExecutor, ObservableUseCase, ResultSender};
pub use result::{BoxError, UseCaseError, UseCaseResult};
