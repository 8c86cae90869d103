//! # Coro: Lazy Tasks and Generators over One Resume Protocol
//!
//! Build lazily started computations out of ordinary `async` blocks and drive
//! them by hand, from another computation, or from an executor.
//!
//! ## Core Types
//!
//! - **[`Task<T>`]**: A computation producing exactly one `T` or one failure
//! - **[`Generator<T>`]**: A synchronous sequence of `T` values, yielded through [`Co`]
//! - **[`AsyncGenerator<T>`]**: A sequence whose producer may await between yields
//!
//! ## Key Features
//!
//! - **Lazy**: Nothing runs until the first resume, advance or await
//! - **Continuation chaining**: Awaiting a computation hands control to it and
//!   back again when it finishes, without growing the stack however deep the
//!   chain of awaits
//! - **Failures surface once**: A failure raised by a body is returned to the
//!   first party that asks for the result, unchanged across nesting
//!
//! ## Example
//!
//! ```
//! use coro::*;
//!
//! fn value(v: i32) -> Task<'static, i32> {
//!     Task::new(async move { anyhow::Ok(v) })
//! }
//!
//! let squares = Generator::new(|co| async move {
//!     for i in 1..=3 {
//!         let v = value(i).await?;
//!         co.yield_(v * v).await;
//!     }
//!     anyhow::Ok(())
//! });
//!
//! let squares: Vec<i32> = squares.into_iter().collect::<Result<_>>().unwrap();
//! assert_eq!(squares, [1, 4, 9]);
//! ```
//!
//! ## Common Functions
//!
//! **Building:**
//! - [`Task::new(future)`] - Wrap a future producing one value
//! - [`Generator::new(body)`] / [`AsyncGenerator::new(body)`] - Wrap a body yielding values
//! - [`suspend()`] - Give control back once from inside a task body
//!
//! **Execution:**
//! - [`Task::resume()`] / [`drain(frame)`] - Drive a frame by hand
//! - [`run_now(awaitable)`] - Block until an awaitable finishes
//! - [`run_awaitable(awaitable)`] - Run for effects, aborting on failure
//! - [`SyncAdapter`] - Iterate an asynchronous generator from ordinary code
//!
//! [`Task::new(future)`]: Task::new
//! [`Generator::new(body)`]: Generator::new
//! [`AsyncGenerator::new(body)`]: AsyncGenerator::new
//! [`Task::resume()`]: Task::resume
//! [`drain(frame)`]: drain
//! [`run_now(awaitable)`]: eager::run_now
//! [`run_awaitable(awaitable)`]: eager::run_awaitable

mod adapter;
mod async_generator;
mod chain;
pub mod eager;
mod error;
mod frame;
mod generator;
pub mod prelude;
mod suspend;
mod task;

pub use adapter::SyncAdapter;
pub use async_generator::{Advance, AsyncCursor, AsyncGenerator};
pub use error::{Error, Result};
pub use frame::{drain, Co, IntoOutcome, Resumable, Yield};
pub use generator::{Cursor, Generator, Iter};
pub use suspend::{suspend, Suspend};
pub use task::{Task, Wait};
