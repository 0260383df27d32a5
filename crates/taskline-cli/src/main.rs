//! taskline - demos of the task queue on real threads.
//!
//! - `contexts`: one serial queue hopping between inline, foreground and
//!   background work, passing a value along
//! - `flow`: retry until ready, skip, a completion added mid-run,
//!   pause/resume and remove_all
//! - `parallel`: bounded parallelism over background tasks
//! - `nested`: a queue run as a single step of another queue
//!
//! Logging follows `RUST_LOG` (default `warn`); `RUST_LOG=taskline_core=debug`
//! shows the queue state transitions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tracing::info;

use taskline_core::{ExecutionContext, Queue, QueueConfig, Task, TokioExecutor};

// ── CLI ─────────────────────────────────────────────────────────────

/// Run one of the task queue demos.
#[derive(Parser, Debug)]
#[command(name = "taskline", version, about)]
struct Cli {
    /// JSON queue configuration, e.g. `{"max_concurrency": 4, "label": "demo"}`.
    #[arg(long, env = "TASKLINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    demo: Demo,
}

#[derive(Subcommand, Debug)]
enum Demo {
    /// Hop between execution contexts, passing a value along.
    Contexts,

    /// Retry, skip, late completions, pause/resume and remove_all.
    Flow {
        /// How many times the polling task retries before it is ready.
        #[arg(long, default_value_t = 3)]
        retries: usize,

        /// Delay between retries in milliseconds.
        #[arg(long, default_value_t = 200)]
        retry_delay_ms: u64,
    },

    /// Run background tasks with bounded parallelism.
    Parallel {
        /// Tasks in flight at most. Overrides the config file.
        #[arg(long)]
        max_concurrency: Option<usize>,

        /// Number of tasks to run.
        #[arg(long, default_value_t = 8)]
        tasks: usize,
    },

    /// Run a queue as one step of another queue.
    Nested,
}

// ── helpers ─────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<QueueConfig> {
    let Some(path) = path else {
        return Ok(QueueConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: QueueConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    info!(path = %path.display(), ?config, "loaded queue config");
    Ok(config)
}

fn thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string()
}

/// Register a completion and wait for the queue to drain.
async fn run_to_drain(queue: &Queue) -> Result<()> {
    let (tx, rx) = oneshot::channel();
    queue.run_then(move || {
        let _ = tx.send(());
    });
    rx.await
        .context("queue dropped its completion (was it cancelled?)")
}

// ── demos ───────────────────────────────────────────────────────────

async fn contexts(queue: Queue) -> Result<()> {
    queue.add_step(ExecutionContext::Inline, |_, next| {
        println!("inline      on {:<22} -> 1", thread_name());
        next.resume_with(1);
    });
    queue.add_step(ExecutionContext::Background, |prev, next| {
        let n = prev.and_then(|v| v.as_u64()).unwrap_or(0);
        std::thread::sleep(Duration::from_millis(100));
        println!("background  on {:<22} {n} -> {}", thread_name(), n * 10);
        next.resume_with(n * 10);
    });
    queue.add_step(ExecutionContext::Foreground, |prev, next| {
        let n = prev.and_then(|v| v.as_u64()).unwrap_or(0);
        println!("foreground  on {:<22} {n} -> {}", thread_name(), n + 2);
        next.resume_with(n + 2);
    });
    queue.add_action(ExecutionContext::Background, || {
        println!("action      on {:<22} (no value)", thread_name());
    });

    run_to_drain(&queue).await?;
    println!("drained, last result: {:?}", queue.last_result());
    Ok(())
}

async fn flow(queue: Queue, retries: usize, retry_delay: Duration) -> Result<()> {
    let polls = Arc::new(AtomicUsize::new(0));
    queue.add(
        Task::new(move |_, next| {
            let poll = polls.fetch_add(1, Ordering::SeqCst);
            if poll < retries {
                println!("poll #{poll}: not ready, retrying in {retry_delay:?}");
                if let Err(rejected) = next.retry(retry_delay) {
                    println!("retry rejected: {rejected}");
                    rejected.into_continuation().done();
                }
                return;
            }
            println!("poll #{poll}: ready");
            next.resume_with("ready");
        })
        .named("poll"),
    );

    let weak = queue.downgrade();
    queue.add_step(ExecutionContext::Inline, move |prev, next| {
        println!("got {prev:?}, skipping the next task");
        if let Some(queue) = weak.upgrade() {
            queue.skip();
        }
        next.done();
    });
    queue.add_action(ExecutionContext::Inline, || println!("never printed"));

    let weak = queue.downgrade();
    queue.add_step(ExecutionContext::Background, move |_, next| {
        if let Some(queue) = weak.upgrade() {
            println!("adding a completion while running");
            queue.run_then(|| println!("late completion fired"));
            println!("pausing: {queue}");
            queue.pause();
        }
        next.done();
    });
    queue.add_action(ExecutionContext::Foreground, || println!("after resume"));

    let weak = queue.downgrade();
    queue.add_step(ExecutionContext::Inline, move |_, next| {
        if let Some(queue) = weak.upgrade() {
            println!("removing the {} remaining tasks", queue.remaining());
            queue.remove_all();
        }
        next.done();
    });
    for i in 0..3 {
        queue.add_action(ExecutionContext::Inline, move || println!("removed task {i} ran"));
    }

    let (tx, mut rx) = oneshot::channel();
    queue.run_then(move || {
        let _ = tx.send(());
    });
    loop {
        tokio::select! {
            drained = &mut rx => {
                drained.context("queue dropped its completion")?;
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if queue.is_paused() && queue.active_count() == 0 {
                    println!("paused: {queue}");
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    println!("resuming");
                    queue.run();
                }
            }
        }
    }
    println!("drained: {queue}");
    Ok(())
}

async fn parallel(queue: Queue, tasks: usize) -> Result<()> {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for i in 0..tasks {
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        queue.add(
            Task::action(move || {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                println!("task {i:>2} start on {:<22} in flight: {now}", thread_name());
                std::thread::sleep(Duration::from_millis(100 * (i as u64 % 3 + 1)));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                println!("task {i:>2} done");
            })
            .on(ExecutionContext::Background)
            .named(format!("sleep-{i}")),
        );
    }

    println!("{queue}");
    run_to_drain(&queue).await?;
    println!(
        "all {tasks} tasks done, peak in flight {} (bound {})",
        peak.load(Ordering::SeqCst),
        queue.max_concurrency()
    );
    Ok(())
}

async fn nested(executor: Arc<TokioExecutor>, base: QueueConfig) -> Result<()> {
    let child = Queue::builder(executor.clone())
        .config(base.clone())
        .label("child")
        .tasks((1..=3u64).map(|n| {
            Task::new(move |prev, next| {
                let sum = prev.and_then(|v| v.as_u64()).unwrap_or(0) + n;
                println!("  child step {n}: sum = {sum}");
                next.resume_with(sum);
            })
            .on(ExecutionContext::Background)
        }))
        .build()?;

    let parent = Queue::builder(executor)
        .config(base)
        .label("parent")
        .task(Task::action(|| println!("parent: before child")))
        .task(Task::queue(&child))
        .task(Task::new(|prev, next| {
            println!("parent: child produced {prev:?}");
            next.resume(prev);
        }))
        .build()?;

    run_to_drain(&parent).await?;
    println!("{parent}");
    println!("{child}");
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let base = load_config(cli.config.as_deref())?;
    let executor = Arc::new(TokioExecutor::current().context("failed to start the executor")?);

    let serial = QueueConfig {
        max_concurrency: 1,
        ..base.clone()
    };

    match cli.demo {
        Demo::Contexts => {
            let queue = Queue::with_config(executor, serial)?;
            contexts(queue).await
        }
        Demo::Flow {
            retries,
            retry_delay_ms,
        } => {
            let queue = Queue::with_config(executor, serial)?;
            flow(queue, retries, Duration::from_millis(retry_delay_ms)).await
        }
        Demo::Parallel {
            max_concurrency,
            tasks,
        } => {
            let max_concurrency = max_concurrency.unwrap_or(if base.max_concurrency > 1 {
                base.max_concurrency
            } else {
                3
            });
            let queue = Queue::with_config(
                executor,
                QueueConfig {
                    max_concurrency,
                    ..base
                },
            )
            .context("invalid --max-concurrency")?;
            parallel(queue, tasks).await
        }
        Demo::Nested => nested(executor, serial).await,
    }
}
