//! Cron-equivalent dispatcher for the platform's background jobs.
//!
//! One ticker task per registered schedule computes the next fire time and
//! message-passes the job over a channel to a bounded worker pool. Job
//! failures are logged and swallowed; the schedule keeps ticking.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

/// A named background job.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn run(&self) -> Result<()>;
}

/// When a job fires.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Once per day at a wall-clock time in the given timezone.
    DailyAt { hour: u32, minute: u32, tz: Tz },
    /// On a fixed interval, first firing one interval from startup.
    Every(Duration),
}

impl Schedule {
    /// Time until the next fire, from `now`.
    fn next_delay(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Schedule::Every(interval) => *interval,
            Schedule::DailyAt { hour, minute, tz } => {
                let local_now = now.with_timezone(tz);
                let mut target_date = local_now.date_naive();

                loop {
                    if let Some(naive) = target_date.and_hms_opt(*hour, *minute, 0) {
                        // `earliest` picks the first valid instant around
                        // DST transitions.
                        if let Some(target) = tz.from_local_datetime(&naive).earliest() {
                            let target_utc = target.with_timezone(&Utc);
                            if target_utc > now {
                                return (target_utc - now)
                                    .to_std()
                                    .unwrap_or(Duration::from_secs(60));
                            }
                        }
                    }
                    target_date = match target_date.succ_opt() {
                        Some(next) => next,
                        None => return Duration::from_secs(24 * 60 * 60),
                    };
                }
            }
        }
    }
}

struct Registration {
    schedule: Schedule,
    job: Arc<dyn Job>,
}

/// Builder for the running scheduler.
pub struct Scheduler {
    registrations: Vec<Registration>,
    workers: usize,
}

impl Scheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            registrations: Vec::new(),
            workers: workers.max(1),
        }
    }

    pub fn register(mut self, schedule: Schedule, job: Arc<dyn Job>) -> Self {
        self.registrations.push(Registration { schedule, job });
        self
    }

    /// Start the ticker tasks and the worker pool.
    pub fn spawn(self) -> SchedulerHandle {
        let (tx, mut rx) = mpsc::channel::<Arc<dyn Job>>(self.registrations.len().max(1) * 2);
        let mut handles = Vec::new();

        for registration in self.registrations {
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let delay = registration.schedule.next_delay(Utc::now());
                    tracing::debug!(
                        "Job '{}' next fire in {:.0}s",
                        registration.job.name(),
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;

                    if tx.send(registration.job.clone()).await.is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        handles.push(tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    let name = job.name().to_string();
                    tracing::info!("Running job '{}'", name);
                    if let Err(e) = job.run().await {
                        tracing::error!("Job '{}' failed: {}", name, e);
                    }
                    drop(permit);
                });
            }
        }));

        SchedulerHandle { handles }
    }
}

/// Handle to the running scheduler's tasks.
pub struct SchedulerHandle {
    handles: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &str {
            "counting"
        }

        async fn run(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingJob;

    #[async_trait]
    impl Job for FailingJob {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run(&self) -> Result<()> {
            anyhow::bail!("always fails")
        }
    }

    #[test]
    fn test_daily_at_computes_delay_in_timezone() {
        let schedule = Schedule::DailyAt {
            hour: 6,
            minute: 0,
            tz: chrono_tz::America::New_York,
        };

        // 2026-07-01 12:00 UTC is 08:00 EDT; next 06:00 EDT is the
        // following day at 10:00 UTC, 22 hours later.
        let now: DateTime<Utc> = "2026-07-01T12:00:00Z".parse().unwrap();
        let delay = schedule.next_delay(now);
        assert_eq!(delay, Duration::from_secs(22 * 60 * 60));

        // 2026-07-01 08:00 UTC is 04:00 EDT; fire later the same day.
        let now: DateTime<Utc> = "2026-07-01T08:00:00Z".parse().unwrap();
        let delay = schedule.next_delay(now);
        assert_eq!(delay, Duration::from_secs(2 * 60 * 60));
    }

    #[test]
    fn test_every_is_fixed_interval() {
        let schedule = Schedule::Every(Duration::from_secs(300));
        assert_eq!(schedule.next_delay(Utc::now()), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_job_fires_repeatedly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::new(2)
            .register(
                Schedule::Every(Duration::from_millis(50)),
                Arc::new(CountingJob { runs: runs.clone() }),
            )
            .spawn();

        tokio::time::timeout(Duration::from_secs(10), async {
            while runs.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job did not fire three times");

        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_job_does_not_stop_schedule() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::new(2)
            .register(Schedule::Every(Duration::from_millis(50)), Arc::new(FailingJob))
            .register(
                Schedule::Every(Duration::from_millis(50)),
                Arc::new(CountingJob { runs: runs.clone() }),
            )
            .spawn();

        tokio::time::timeout(Duration::from_secs(10), async {
            while runs.load(Ordering::SeqCst) < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("healthy job starved by failing job");

        handle.shutdown();
    }
}
