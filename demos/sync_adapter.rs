//! Consumes an endless asynchronous generator from ordinary code.

use coro::{AsyncGenerator, SyncAdapter};
use tracing_subscriber::EnvFilter;

fn async_iota(start: i32) -> AsyncGenerator<'static, i32> {
    AsyncGenerator::new(move |co| async move {
        for i in start.. {
            co.yield_(i).await;
        }
    })
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    for n in SyncAdapter::new(async_iota(10)).take(5) {
        println!("{}", n?);
    }

    // 10
    // 11
    // 12
    // 13
    // 14
    Ok(())
}
