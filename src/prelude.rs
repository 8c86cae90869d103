//! Commonly used imports
//!
//! Use `use coro::prelude::*;` for quick access to the most common types and functions.

// Core types
pub use crate::{AsyncGenerator, Generator, Task};

// Errors
pub use crate::{Error, Result};

// Suspension
pub use crate::{suspend, Co, Resumable};

// Execution
pub use crate::eager::{run_awaitable, run_now};
pub use crate::{drain, SyncAdapter};
