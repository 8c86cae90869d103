//! Awaits two tasks from a third and prints their sum.

use coro::{eager::run_awaitable, Task};
use tracing_subscriber::EnvFilter;

fn task1() -> Task<'static, i32> {
    Task::new(async { anyhow::Ok(123) })
}

fn task2() -> Task<'static, i32> {
    Task::new(async { anyhow::Ok(456) })
}

fn sum() -> Task<'static, i32> {
    Task::new(async {
        let a = task1().await?;
        let b = task2().await?;
        anyhow::Ok(a + b)
    })
}

fn print() -> Task<'static, ()> {
    Task::new(async {
        println!("The result is {}", sum().await?);
        anyhow::Ok(())
    })
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // The result is 579
    run_awaitable(print());
}
