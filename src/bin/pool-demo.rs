use std::process::exit;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use taskpool::{PoolError, PoolMode, Result, ThreadPool};

const DEFAULT_MODE: &str = "fixed";

#[derive(Parser)]
#[command(name = "pool-demo", version, about = "A worker pool demonstration")]
struct Cli {
    /// Pool mode: "fixed" or "elastic"
    #[arg(long, default_value = DEFAULT_MODE, value_name = "MODE-NAME")]
    mode: String,

    /// Number of worker threads
    #[arg(long, value_name = "N")]
    threads: Option<u32>,

    /// Task queue capacity
    #[arg(long, value_name = "N")]
    queue_capacity: Option<usize>,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mode = resolve_mode(&cli.mode)?;
    let threads = cli.threads.unwrap_or(num_cpus::get() as u32);

    info!("pool-demo {}", env!("CARGO_PKG_VERSION"));
    info!("Pool mode: {}", cli.mode);
    info!("Worker threads: {}", threads);

    let mut pool = ThreadPool::new();
    pool.set_mode(mode);
    if let Some(capacity) = cli.queue_capacity {
        pool.set_queue_capacity(capacity);
    }
    pool.start(threads)?;

    let r1 = pool.submit(|| {
        thread::sleep(Duration::from_secs(1));
        1 + 2
    });
    let r2 = pool.submit(|| {
        thread::sleep(Duration::from_secs(1));
        1 + 2 + 3
    });
    let r3 = pool.submit(|| (1..100).sum::<i32>());

    println!("1 + 2 = {}", r1.get().extract::<i32>()?);
    println!("1 + 2 + 3 = {}", r2.get().extract::<i32>()?);
    println!("sum(1..100) = {}", r3.get().extract::<i32>()?);

    pool.join();
    Ok(())
}

/// Resolves the pool mode name, rejecting anything unknown.
fn resolve_mode(mode: &str) -> Result<PoolMode> {
    match mode {
        "fixed" => Ok(PoolMode::Fixed),
        "elastic" => Ok(PoolMode::Elastic),
        _ => Err(PoolError::InvalidConfig(format!(
            "Invalid mode: {}. Must be 'fixed' or 'elastic'.",
            mode
        ))),
    }
}
