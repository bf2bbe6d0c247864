use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::command::Origin;
use crate::config::ScheduleConfig;
use crate::core::Core;
use crate::utils::time::now_secs;

/// One timed command. `running` is true for at most the duration of a single
/// invocation; a tick that finds it set skips the entry instead of queueing.
#[derive(Debug)]
pub struct ScheduleEntry {
    pub command: String,
    pub interval_seconds: u64,
    last_run_at: AtomicU64,
    running: AtomicBool,
}

impl ScheduleEntry {
    fn new(command: String, interval_seconds: u64) -> Self {
        Self {
            command,
            interval_seconds,
            last_run_at: AtomicU64::new(0),
            running: AtomicBool::new(false),
        }
    }

    pub fn last_run_at(&self) -> u64 {
        self.last_run_at.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn due(&self, now: u64) -> bool {
        let last = self.last_run_at.load(Ordering::Acquire);
        last == 0 || now.saturating_sub(last) >= self.interval_seconds
    }
}

/// Evaluates every entry once per tick and fires the due ones through the
/// router with origin `scheduled`. Entries run on their own tasks so a slow
/// capability only blocks its own entry.
pub struct Scheduler {
    entries: Vec<Arc<ScheduleEntry>>,
    tick: Duration,
    core: Arc<Core>,
}

impl Scheduler {
    pub fn new(config: &ScheduleConfig, core: Arc<Core>) -> Self {
        let entries = config
            .tasks
            .iter()
            .map(|task| Arc::new(ScheduleEntry::new(task.command.clone(), task.interval_seconds)))
            .collect();
        Self {
            entries,
            tick: Duration::from_secs(config.tick_seconds.max(1)),
            core,
        }
    }

    pub fn entries(&self) -> &[Arc<ScheduleEntry>] {
        &self.entries
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(entries = self.entries.len(), "scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => self.tick_once(),
            }
        }
        tracing::info!("scheduler stopped");
    }

    fn tick_once(&self) {
        let now = now_secs();
        for entry in &self.entries {
            if !entry.due(now) {
                continue;
            }
            // The flag is our non-overlap guard: losing this exchange means
            // the previous invocation is still in flight, so skip the tick.
            if entry
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                tracing::debug!(command = %entry.command, "previous run still active, skipping tick");
                continue;
            }
            let entry = entry.clone();
            let core = self.core.clone();
            tokio::spawn(async move {
                let result = core.submit(&entry.command, Origin::Scheduled).await;
                if !result.success {
                    tracing::warn!(
                        command = %entry.command,
                        reply = %result.reply_text,
                        "scheduled command failed"
                    );
                }
                entry.last_run_at.store(now_secs(), Ordering::Release);
                entry.running.store(false, Ordering::Release);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        boxed_reply_future, CapabilityRegistry, CapabilityResult, FnCapability,
    };
    use crate::config::ScheduledTask;
    use crate::routing::{DispatchAudit, RouterOptions};
    use std::sync::atomic::AtomicUsize;

    fn counting_core(delay: Duration, counter: Arc<AtomicUsize>) -> Arc<Core> {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(FnCapability::new(
            "probe",
            ["probe"],
            Arc::new(move |_, _| {
                let counter = counter.clone();
                boxed_reply_future(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    Ok(CapabilityResult::ok("probed"))
                })
            }),
        )));
        Arc::new(
            Core::new(
                registry,
                Arc::new(DispatchAudit::new()),
                RouterOptions::default(),
            )
            .expect("valid core"),
        )
    }

    fn schedule(tick_seconds: u64, interval_seconds: u64) -> ScheduleConfig {
        ScheduleConfig {
            tick_seconds,
            tasks: vec![ScheduledTask {
                command: "probe".to_string(),
                interval_seconds,
            }],
        }
    }

    #[tokio::test]
    async fn slow_entry_skips_ticks_instead_of_queueing() {
        let counter = Arc::new(AtomicUsize::new(0));
        // Entry is due on every tick, but the capability outlives several
        // ticks; the non-overlap guard must hold invocations to one.
        let core = counting_core(Duration::from_secs(30), counter.clone());
        let scheduler = Scheduler::new(&schedule(1, 0), core);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(scheduler.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let _ = shutdown_tx.send(true);
        handle.await.expect("scheduler task");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn entries_due_on_first_tick() {
        let counter = Arc::new(AtomicUsize::new(0));
        let core = counting_core(Duration::from_millis(1), counter.clone());
        let scheduler = Scheduler::new(&schedule(1, 3600), core);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(scheduler.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = shutdown_tx.send(true);
        handle.await.expect("scheduler task");

        // interval of an hour: exactly the startup invocation
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_entry_does_not_stop_the_loop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(FnCapability::new(
            "broken",
            ["broken"],
            Arc::new(|_, _| {
                boxed_reply_future(async {
                    Ok(CapabilityResult::failure("no backend"))
                })
            }),
        )));
        let tally = counter.clone();
        registry.register(Arc::new(FnCapability::new(
            "probe",
            ["probe"],
            Arc::new(move |_, _| {
                let tally = tally.clone();
                boxed_reply_future(async move {
                    tally.fetch_add(1, Ordering::SeqCst);
                    Ok(CapabilityResult::ok("probed"))
                })
            }),
        )));
        let core = Arc::new(
            Core::new(
                registry,
                Arc::new(DispatchAudit::new()),
                RouterOptions::default(),
            )
            .expect("valid core"),
        );

        let config = ScheduleConfig {
            tick_seconds: 1,
            tasks: vec![
                ScheduledTask {
                    command: "broken".to_string(),
                    interval_seconds: 3600,
                },
                ScheduledTask {
                    command: "probe".to_string(),
                    interval_seconds: 3600,
                },
            ],
        };
        let scheduler = Scheduler::new(&config, core);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(scheduler.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = shutdown_tx.send(true);
        handle.await.expect("scheduler task");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
