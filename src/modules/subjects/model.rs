pub use rollcall_models::schedule::{ExistingTiming, ScheduleError, Timing, TimingDto};
pub use rollcall_models::subjects::*;
