// Reclaim core: tier table, pressure evaluation, victim selection,
// kill dispatch and cooldown

mod coordinator;
mod dispatch;
mod pressure;
mod selector;
mod source;
mod tier;

pub use coordinator::{PassOutcome, ReapCoordinator, ReclaimCounters, KILL_GRACE_PERIOD};
pub use dispatch::{NoopDispatcher, SignalDispatcher, TerminationDispatcher};
pub use pressure::{
    EvalResult, FreePolicy, InactiveCache, PressureEvaluator, PressureReading, ReclaimableCache,
};
pub use selector::select_victim;
pub use source::{FixtureSource, ProcessCandidate, ProcessSource};
pub use tier::{TierEntry, TierTable, MAX_TIERS, PRIORITY_MAX, PRIORITY_MIN};
