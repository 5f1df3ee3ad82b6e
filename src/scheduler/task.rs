use enum_map::Enum;

/// The kind of GC operation a task performs.  The collector splits a GC phase into tasks of
/// these kinds, and dispatches on the kind in [`crate::vm::Collector::worker_task_processing`].
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Enum,
    strum_macros::Display,
    strum_macros::IntoStaticStr,
    strum_macros::EnumIter,
)]
pub enum GCWorkersTaskTypes {
    /// Mark objects reachable from a marking stack.
    #[strum(serialize = "TASK_MARKING")]
    Marking,
    /// Re-mark objects during the final pause of a concurrent marking.
    #[strum(serialize = "TASK_REMARK")]
    Remark,
    /// Mark all objects, following all references.
    #[strum(serialize = "TASK_FULL_MARK")]
    FullMark,
    /// Evacuate the live objects of one region.
    #[strum(serialize = "TASK_REGION_COMPACTING")]
    RegionCompacting,
    /// Give free pages back to the operating system.
    #[strum(serialize = "TASK_RETURN_FREE_PAGES_TO_OS")]
    ReturnFreePagesToOs,
    /// Update references to moved objects and enqueue the affected remembered-set cards.
    #[strum(serialize = "TASK_ENQUEUE_REMSET_REFS")]
    EnqueueRemsetRefs,
}

impl GCWorkersTaskTypes {
    /// The stable name of the task type, e.g. `TASK_MARKING`.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// A unit of work for GC workers: a task type and a payload that only the collector understands.
///
/// A task is created by the collector, moved into the pool by
/// [`crate::scheduler::GCWorkersTaskPool::add_task`], and consumed by whichever thread executes
/// it.  It is never re-queued.
pub struct GCWorkersTask<P> {
    ty: GCWorkersTaskTypes,
    payload: P,
}

impl<P> GCWorkersTask<P> {
    pub fn new(ty: GCWorkersTaskTypes, payload: P) -> Self {
        Self { ty, payload }
    }

    pub fn get_type(&self) -> GCWorkersTaskTypes {
        self.ty
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    /// Consume the task and take its payload.
    pub fn into_payload(self) -> P {
        self.payload
    }
}

impl<P: Default> From<GCWorkersTaskTypes> for GCWorkersTask<P> {
    /// Tasks such as [`GCWorkersTaskTypes::ReturnFreePagesToOs`] carry no data.
    fn from(ty: GCWorkersTaskTypes) -> Self {
        Self::new(ty, P::default())
    }
}

impl<P> std::fmt::Debug for GCWorkersTask<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GCWorkersTask")
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn task_type_names() {
        assert_eq!(GCWorkersTaskTypes::Marking.name(), "TASK_MARKING");
        assert_eq!(
            GCWorkersTaskTypes::ReturnFreePagesToOs.to_string(),
            "TASK_RETURN_FREE_PAGES_TO_OS"
        );
        for ty in GCWorkersTaskTypes::iter() {
            assert!(ty.name().starts_with("TASK_"));
        }
    }

    #[test]
    fn task_without_payload() {
        let task: GCWorkersTask<()> = GCWorkersTaskTypes::ReturnFreePagesToOs.into();
        assert_eq!(task.get_type(), GCWorkersTaskTypes::ReturnFreePagesToOs);
    }

    #[test]
    fn payload_moves_out() {
        let mut task = GCWorkersTask::new(GCWorkersTaskTypes::Marking, vec![1usize, 2, 3]);
        task.payload_mut().push(4);
        assert_eq!(task.payload().len(), 4);
        assert_eq!(task.into_payload(), vec![1, 2, 3, 4]);
    }
}
