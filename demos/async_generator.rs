//! An asynchronous producer that awaits a task between yields.

use coro::{eager::run_awaitable, AsyncGenerator, Task};
use futures::TryStreamExt;
use tracing_subscriber::EnvFilter;

fn square(n: u32) -> Task<'static, u32> {
    Task::new(async move {
        coro::suspend().await;
        anyhow::Ok(n * n)
    })
}

fn squares(n: u32) -> AsyncGenerator<'static, u32> {
    AsyncGenerator::new(move |co| async move {
        for i in 1..=n {
            co.yield_(square(i).await?).await;
        }
        anyhow::Ok(())
    })
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    run_awaitable(Task::new(async {
        let gen = squares(5);
        let mut it = gen.begin().await?;
        while it != gen.end() {
            print!("{} ", *it.get()?);
            it = it.advance()?.await?;
        }
        println!();

        let collected: Vec<u32> = squares(5).try_collect().await?;
        println!("{collected:?}");
        anyhow::Ok(())
    }));

    // 1 4 9 16 25
    // [1, 4, 9, 16, 25]
}
