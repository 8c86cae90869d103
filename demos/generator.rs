//! Prints the first ten Fibonacci numbers, once through cursors and once as
//! an iterator.

use coro::Generator;
use tracing_subscriber::EnvFilter;

fn fibonacci(n: usize) -> Generator<'static, u64> {
    Generator::new(move |co| async move {
        let (mut a, mut b) = (0, 1);
        for _ in 0..n {
            co.yield_(a).await;
            (a, b) = (b, a + b);
        }
    })
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let gen = fibonacci(10);
    let mut it = gen.begin()?;
    while it != gen.end() {
        print!("{} ", *it.get()?);
        it.advance()?;
    }
    println!();

    for n in fibonacci(10) {
        print!("{} ", n?);
    }
    println!();

    // 0 1 1 2 3 5 8 13 21 34
    // 0 1 1 2 3 5 8 13 21 34
    Ok(())
}
