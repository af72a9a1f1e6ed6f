use std::sync::Arc;

use chrono::{
    DateTime,
    Utc,
};
use indexmap::IndexMap;

use crate::domain::metrics::{
    round1,
    round2,
};
use crate::domain::{
    BucketMetrics,
    MetricsSnapshot,
    OverallKpis,
    Run,
    RunStatus,
    StatusDistribution,
    Window,
};
use crate::infrastructure::RunRegistry;

const DEFAULT_HOUR_BUCKET_WIDTH: u32 = 4;

/// Windowed statistics over the run registry. Every figure is recomputed
/// from registry state on each call; nothing here is cached, so results
/// always reflect the latest accepted events.
pub struct MetricsService {
    registry: Arc<RunRegistry>,
    hour_bucket_width: u32,
}

impl MetricsService {
    pub fn new(registry: Arc<RunRegistry>) -> Self {
        Self::with_hour_bucket_width(registry, DEFAULT_HOUR_BUCKET_WIDTH)
    }

    pub fn with_hour_bucket_width(registry: Arc<RunRegistry>, hour_bucket_width: u32) -> Self {
        Self {
            registry,
            hour_bucket_width,
        }
    }

    pub fn snapshot(&self, window: Window) -> MetricsSnapshot {
        self.snapshot_at(window, Utc::now())
    }

    /// Pure function of registry state and `at`: repeated calls with the
    /// same inputs return identical snapshots. Only finished runs
    /// participate; in-flight runs show up in the status distribution
    /// instead.
    pub fn snapshot_at(&self, window: Window, at: DateTime<Utc>) -> MetricsSnapshot {
        let spans = window.bucket_spans(at, self.hour_bucket_width);
        let runs = self.finished_runs();

        let mut buckets = IndexMap::with_capacity(spans.len());
        for span in spans {
            let in_bucket: Vec<&Run> =
                runs.iter().filter(|r| span.contains(r.started_at)).collect();
            buckets.insert(span.label, bucket_metrics(&in_bucket));
        }

        MetricsSnapshot { window, buckets }
    }

    pub fn overall_kpis(&self, window: Window) -> OverallKpis {
        self.overall_kpis_at(window, Utc::now())
    }

    /// Aggregated across the whole window span rather than per bucket.
    /// An empty window reports 100% success (vacuous) and a 0% error rate.
    pub fn overall_kpis_at(&self, window: Window, at: DateTime<Utc>) -> OverallKpis {
        let spans = window.bucket_spans(at, self.hour_bucket_width);
        let (start, end) = match (spans.first(), spans.last()) {
            (Some(first), Some(last)) => (first.start, last.end),
            _ => (at, at),
        };

        let runs = self.finished_runs();
        let in_window: Vec<&Run> = runs
            .iter()
            .filter(|r| start <= r.started_at && r.started_at < end)
            .collect();

        if in_window.is_empty() {
            return OverallKpis {
                success_rate_percent: 100.0,
                avg_duration_seconds: 0.0,
                avg_records_per_run: 0.0,
                error_rate_percent: 0.0,
            };
        }

        let total = in_window.len();
        let completed = in_window
            .iter()
            .filter(|r| r.status == RunStatus::Completed)
            .count();
        let total_duration: i64 = in_window
            .iter()
            .filter_map(|r| r.duration_seconds())
            .sum();
        let total_records: i64 = in_window.iter().map(|r| r.records_processed).sum();

        let success_rate_percent = round1(100.0 * completed as f64 / total as f64);

        OverallKpis {
            success_rate_percent,
            avg_duration_seconds: round2(total_duration as f64 / total as f64),
            avg_records_per_run: round2(total_records as f64 / total as f64),
            error_rate_percent: round1(100.0 - success_rate_percent),
        }
    }

    /// Counts of runs in each status right now, over the whole registry.
    pub fn status_distribution(&self) -> StatusDistribution {
        let mut distribution = StatusDistribution::default();
        for run in self.registry.runs() {
            distribution.record(run.status);
        }
        distribution
    }

    fn finished_runs(&self) -> Vec<Run> {
        self.registry
            .runs()
            .into_iter()
            .filter(|r| r.status.is_terminal())
            .collect()
    }
}

fn bucket_metrics(runs: &[&Run]) -> BucketMetrics {
    if runs.is_empty() {
        return BucketMetrics::empty();
    }

    let count = runs.len();
    let completed = runs
        .iter()
        .filter(|r| r.status == RunStatus::Completed)
        .count();
    // Integer sums first, one division at the end: the result does not
    // depend on the registry's iteration order.
    let total_duration: i64 = runs.iter().filter_map(|r| r.duration_seconds()).sum();
    let total_records: i64 = runs.iter().map(|r| r.records_processed).sum();

    BucketMetrics {
        run_count: count,
        avg_duration_seconds: round2(total_duration as f64 / count as f64),
        total_records,
        success_rate_percent: round1(100.0 * completed as f64 / count as f64),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{
        Duration,
        TimeZone,
    };

    use super::*;
    use crate::domain::{
        JobName,
        JobStatus,
    };

    fn ts(day: u32, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, min, sec).unwrap()
    }

    fn complete_run(
        registry: &RunRegistry, id: &str, started_at: DateTime<Utc>, duration_seconds: i64,
        records: i64,
    ) {
        registry.record_run_started(id, started_at).unwrap();
        registry
            .record_job_event(id, JobName::Load, JobStatus::Running, 0, 0, None)
            .unwrap();
        registry
            .record_job_event(
                id,
                JobName::Load,
                JobStatus::Completed,
                duration_seconds,
                records,
                None,
            )
            .unwrap();
        registry
            .finalize_run(id, started_at + Duration::seconds(duration_seconds))
            .unwrap();
    }

    fn fail_run(
        registry: &RunRegistry, id: &str, started_at: DateTime<Utc>, duration_seconds: i64,
    ) {
        registry.record_run_started(id, started_at).unwrap();
        registry
            .record_job_event(id, JobName::Extract, JobStatus::Running, 0, 0, None)
            .unwrap();
        registry
            .record_job_event(
                id,
                JobName::Extract,
                JobStatus::Failed,
                duration_seconds,
                0,
                Some("boom".to_string()),
            )
            .unwrap();
        registry
            .finalize_run(id, started_at + Duration::seconds(duration_seconds))
            .unwrap();
    }

    /// The three reference runs from 2024-01-15.
    fn sample_registry() -> Arc<RunRegistry> {
        let registry = Arc::new(RunRegistry::new());
        complete_run(&registry, "run-2024-001", ts(15, 10, 30, 0), 135, 45200);
        complete_run(&registry, "run-2024-002", ts(15, 9, 30, 0), 118, 42800);
        fail_run(&registry, "run-2024-003", ts(15, 8, 30, 0), 72);
        registry
    }

    #[test]
    fn test_sample_day_bucket() {
        let service = MetricsService::new(sample_registry());
        let snapshot = service.snapshot_at(Window::Last7Days, ts(15, 12, 0, 0));

        assert_eq!(snapshot.buckets.len(), 7);

        // All three runs started on Monday the 15th.
        let monday = &snapshot.buckets["Mon"];
        assert_eq!(monday.run_count, 3);
        assert_eq!(monday.total_records, 88_000);
        assert_eq!(monday.success_rate_percent, 66.7);
        assert_eq!(monday.avg_duration_seconds, 108.33);

        // Days without runs are vacuously successful.
        let tuesday = &snapshot.buckets["Tue"];
        assert_eq!(*tuesday, BucketMetrics::empty());
    }

    #[test]
    fn test_hourly_buckets() {
        let service = MetricsService::new(sample_registry());
        let snapshot = service.snapshot_at(Window::Last24Hours, ts(15, 12, 0, 0));

        assert_eq!(snapshot.buckets.len(), 6);
        // 08:30 and 10:30 / 09:30 straddle the 4-hour boundary at 09:00.
        assert_eq!(snapshot.buckets["05:00"].run_count, 1);
        assert_eq!(snapshot.buckets["09:00"].run_count, 2);
        assert_eq!(snapshot.buckets["09:00"].success_rate_percent, 100.0);
        assert_eq!(snapshot.buckets["05:00"].success_rate_percent, 0.0);
    }

    #[test]
    fn test_non_divisor_hour_width_counts_recent_runs() {
        let registry = Arc::new(RunRegistry::new());
        complete_run(&registry, "run-recent", ts(15, 11, 30, 0), 60, 100);
        let service = MetricsService::with_hour_bucket_width(registry, 5);

        let snapshot = service.snapshot_at(Window::Last24Hours, ts(15, 12, 0, 0));
        assert_eq!(snapshot.buckets.len(), 5);

        // A run started half an hour before `at` lands in the final bucket.
        assert_eq!(snapshot.buckets["08:00"].run_count, 1);
        let total: usize = snapshot.buckets.values().map(|b| b.run_count).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_snapshot_is_deterministic() {
        let service = MetricsService::new(sample_registry());
        let at = ts(15, 12, 0, 0);

        for window in [
            Window::Last24Hours,
            Window::Last7Days,
            Window::Last30Days,
            Window::Last90Days,
        ] {
            let a = service.snapshot_at(window, at);
            let b = service.snapshot_at(window, at);
            assert_eq!(a, b);
            assert_eq!(
                serde_json::to_string(&a).unwrap(),
                serde_json::to_string(&b).unwrap()
            );
        }
    }

    #[test]
    fn test_in_flight_runs_are_excluded_from_aggregates() {
        let registry = sample_registry();
        registry.record_run_started("run-2024-004", ts(15, 11, 0, 0)).unwrap();
        let service = MetricsService::new(registry);

        let snapshot = service.snapshot_at(Window::Last7Days, ts(15, 12, 0, 0));
        assert_eq!(snapshot.buckets["Mon"].run_count, 3);

        let distribution = service.status_distribution();
        assert_eq!(distribution.running, 1);
        assert_eq!(distribution.completed, 2);
        assert_eq!(distribution.failed, 1);
        assert_eq!(distribution.total(), 4);
    }

    #[test]
    fn test_empty_registry_kpis() {
        let service = MetricsService::new(Arc::new(RunRegistry::new()));
        let kpis = service.overall_kpis_at(Window::Last7Days, ts(15, 12, 0, 0));

        assert_eq!(kpis.success_rate_percent, 100.0);
        assert_eq!(kpis.error_rate_percent, 0.0);
        assert_eq!(kpis.avg_duration_seconds, 0.0);
        assert_eq!(kpis.avg_records_per_run, 0.0);
    }

    #[test]
    fn test_exact_success_ratio() {
        let registry = Arc::new(RunRegistry::new());
        for i in 0..3 {
            complete_run(&registry, &format!("ok-{i}"), ts(15, 9, 0, i), 60, 100);
        }
        fail_run(&registry, "bad-0", ts(15, 9, 30, 0), 30);
        let service = MetricsService::new(registry);

        let snapshot = service.snapshot_at(Window::Last7Days, ts(15, 12, 0, 0));
        assert_eq!(snapshot.buckets["Mon"].success_rate_percent, 75.0);
    }

    /// Seven days of reference performance data: per-day mean durations
    /// 140, 135, 160, 125, 145, 130, 133 and per-day success percentages
    /// 95, 98, 92, 100, 96, 98, 100 over 100 runs each.
    #[test]
    fn test_week_of_reference_traffic() {
        let durations = [140, 135, 160, 125, 145, 130, 133];
        let successes = [95, 98, 92, 100, 96, 98, 100];

        let registry = Arc::new(RunRegistry::new());
        for day in 0..7 {
            let day_start = ts(9 + day as u32, 6, 0, 0);
            for i in 0..100 {
                let id = format!("run-d{day}-{i:03}");
                let started = day_start + Duration::seconds(i * 60);
                if i < successes[day] {
                    complete_run(&registry, &id, started, durations[day], 450);
                } else {
                    fail_run(&registry, &id, started, durations[day]);
                }
            }
        }
        let service = MetricsService::new(registry);
        let at = ts(15, 23, 0, 0);

        let kpis = service.overall_kpis_at(Window::Last7Days, at);
        assert_eq!(kpis.success_rate_percent, 97.0);
        assert_eq!(kpis.error_rate_percent, 3.0);
        // 968 seconds over 7 days of equal traffic.
        assert!((kpis.avg_duration_seconds - 968.0 / 7.0).abs() < 0.01);
        assert_eq!(kpis.avg_records_per_run, 436.5);

        let snapshot = service.snapshot_at(Window::Last7Days, at);
        assert_eq!(snapshot.buckets["Tue"].success_rate_percent, 95.0);
        assert_eq!(snapshot.buckets["Tue"].avg_duration_seconds, 140.0);
        assert_eq!(snapshot.buckets["Mon"].success_rate_percent, 100.0);
    }

    #[test]
    fn test_month_window_spans_quarters() {
        let registry = Arc::new(RunRegistry::new());
        complete_run(&registry, "nov-run", ts(15, 10, 0, 0) - Duration::days(60), 100, 500);
        complete_run(&registry, "jan-run", ts(15, 10, 0, 0), 100, 500);
        let service = MetricsService::new(registry);

        let snapshot = service.snapshot_at(Window::Last90Days, ts(15, 12, 0, 0));
        assert_eq!(snapshot.buckets["Nov"].run_count, 1);
        assert_eq!(snapshot.buckets["Jan"].run_count, 1);
        assert_eq!(snapshot.buckets["Dec"], BucketMetrics::empty());
    }
}
