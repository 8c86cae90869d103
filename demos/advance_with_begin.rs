//! Walks both kinds of generator by calling `begin` repeatedly.

use coro::{eager::run_awaitable, AsyncGenerator, Generator, Task};
use tracing_subscriber::EnvFilter;

fn get_next_value(n: i32) -> Task<'static, i32> {
    Task::new(async move { anyhow::Ok(n + 1) })
}

fn async_first_n(n: i32) -> AsyncGenerator<'static, i32> {
    AsyncGenerator::new(move |co| async move {
        let mut v = 0;
        while v < n {
            co.yield_(v).await;
            v = get_next_value(v).await?;
        }
        anyhow::Ok(())
    })
}

fn sync_first_n(n: i32) -> Generator<'static, i32> {
    Generator::new(move |co| async move {
        let mut v = 0;
        while v < n {
            co.yield_(v).await;
            v += 1;
        }
    })
}

fn iterate_over_async() {
    run_awaitable(Task::new(async {
        let gen = async_first_n(5);
        let mut it = gen.begin().await?;
        let end = gen.end();
        while it != end {
            print!("{} ", *it.get()?);
            it = gen.begin().await?;
        }
        println!();
        anyhow::Ok(())
    }));
}

fn iterate_over_sync() -> anyhow::Result<()> {
    let gen = sync_first_n(5);
    let mut it = gen.begin()?;
    let end = gen.end();
    while it != end {
        print!("{} ", *it.get()?);
        it = gen.begin()?;
    }
    println!();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    println!("Iterating over asynchronous generator:");
    iterate_over_async();
    println!("Iterating over synchronous generator:");
    iterate_over_sync()?;

    // Iterating over asynchronous generator:
    // 0 1 2 3 4
    // Iterating over synchronous generator:
    // 0 1 2 3 4
    Ok(())
}
