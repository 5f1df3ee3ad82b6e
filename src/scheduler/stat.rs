//! Statistics of executed GC tasks, kept per worker and merged on request.

use super::task::GCWorkersTaskTypes;
use enum_map::EnumMap;
use std::collections::HashMap;
use std::time::Instant;

/// Execution times (in nanoseconds) of one task type.
#[derive(Copy, Clone, Debug)]
struct WorkDuration {
    total: f64,
    min: f64,
    max: f64,
}

impl Default for WorkDuration {
    fn default() -> Self {
        WorkDuration {
            total: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl WorkDuration {
    fn process_duration(&mut self, duration: f64) {
        self.min = self.min.min(duration);
        self.max = self.max.max(duration);
        self.total += duration;
    }

    fn merge_duration_inplace(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.total += other.total;
    }
}

/// Statistics recorded by one executing thread.
#[derive(Default, Debug)]
pub struct WorkerLocalStat {
    counts: EnumMap<GCWorkersTaskTypes, usize>,
    durations: EnumMap<GCWorkersTaskTypes, WorkDuration>,
}

impl WorkerLocalStat {
    pub(crate) fn record(&mut self, ty: GCWorkersTaskTypes, duration_ns: f64) {
        self.counts[ty] += 1;
        self.durations[ty].process_duration(duration_ns);
    }

    pub fn count(&self, ty: GCWorkersTaskTypes) -> usize {
        self.counts[ty]
    }
}

/// Started by `WorkStat::start` before a task executes, and recorded into a `WorkerLocalStat`
/// after it completes.
pub(crate) struct WorkStat {
    ty: GCWorkersTaskTypes,
    start: Instant,
}

impl WorkStat {
    pub fn start(ty: GCWorkersTaskTypes) -> Self {
        Self {
            ty,
            start: Instant::now(),
        }
    }

    pub fn end_of_work(self, stat: &mut WorkerLocalStat) {
        let duration = self.start.elapsed().as_nanos() as f64;
        stat.record(self.ty, duration);
    }
}

/// The merged statistics of all the threads that executed tasks of a pool.
#[derive(Default)]
pub struct SchedulerStat {
    counts: EnumMap<GCWorkersTaskTypes, usize>,
    durations: EnumMap<GCWorkersTaskTypes, WorkDuration>,
}

impl SchedulerStat {
    pub fn merge(&mut self, stat: &WorkerLocalStat) {
        for (ty, count) in stat.counts.iter() {
            self.counts[ty] += count;
        }
        for (ty, duration) in stat.durations.iter() {
            self.durations[ty].merge_duration_inplace(duration);
        }
    }

    pub fn count(&self, ty: GCWorkersTaskTypes) -> usize {
        self.counts[ty]
    }

    pub fn total_count(&self) -> usize {
        self.counts.values().sum()
    }

    /// Format the statistics as key/value pairs, e.g. `task.TASK_MARKING.count`.  Task types
    /// that were never executed are omitted.
    pub fn harness_stat(&self) -> HashMap<String, String> {
        let mut stat = HashMap::new();
        let mut duration_overall = WorkDuration::default();
        for (ty, count) in self.counts.iter() {
            if *count == 0 {
                continue;
            }
            let name = ty.name();
            let duration = &self.durations[ty];
            duration_overall.merge_duration_inplace(duration);
            stat.insert(format!("task.{}.count", name), format!("{}", count));
            stat.insert(
                format!("task.{}.time.total", name),
                format!("{:.2}", duration.total),
            );
            stat.insert(
                format!("task.{}.time.min", name),
                format!("{:.2}", duration.min),
            );
            stat.insert(
                format!("task.{}.time.max", name),
                format!("{:.2}", duration.max),
            );
        }
        stat.insert(
            "total-task.count".to_owned(),
            format!("{}", self.total_count()),
        );
        stat.insert(
            "total-task.time.total".to_owned(),
            format!("{:.2}", duration_overall.total),
        );
        stat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_and_format() {
        let mut a = WorkerLocalStat::default();
        a.record(GCWorkersTaskTypes::Marking, 10.0);
        a.record(GCWorkersTaskTypes::Marking, 30.0);
        let mut b = WorkerLocalStat::default();
        b.record(GCWorkersTaskTypes::Marking, 20.0);
        b.record(GCWorkersTaskTypes::RegionCompacting, 5.0);

        let mut merged = SchedulerStat::default();
        merged.merge(&a);
        merged.merge(&b);
        assert_eq!(merged.count(GCWorkersTaskTypes::Marking), 3);
        assert_eq!(merged.total_count(), 4);

        let stat = merged.harness_stat();
        assert_eq!(stat["task.TASK_MARKING.count"], "3");
        assert_eq!(stat["task.TASK_MARKING.time.total"], "60.00");
        assert_eq!(stat["task.TASK_MARKING.time.min"], "10.00");
        assert_eq!(stat["task.TASK_MARKING.time.max"], "30.00");
        assert_eq!(stat["task.TASK_REGION_COMPACTING.count"], "1");
        assert_eq!(stat["total-task.count"], "4");
        assert_eq!(stat["total-task.time.total"], "65.00");
        assert!(!stat.contains_key("task.TASK_REMARK.count"));
    }

    #[test]
    fn measure_one_task() {
        let mut local = WorkerLocalStat::default();
        let work = WorkStat::start(GCWorkersTaskTypes::Remark);
        work.end_of_work(&mut local);
        assert_eq!(local.count(GCWorkersTaskTypes::Remark), 1);
        assert_eq!(local.count(GCWorkersTaskTypes::Marking), 0);
    }
}
