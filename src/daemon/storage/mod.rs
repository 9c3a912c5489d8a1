//!  Storage is organized through [activity_storage::ActivityStorage].
//!  The basic idea is:
//!   - The tracker emits [session_event::WindowSession] when focus moves to another window.
//!   - Every session is appended to a raw log, one file per UTC day.
//!   - Durations are summed into a per-day, per-application rollup.

pub mod activity_storage;
pub mod entities;
pub mod session_event;
pub mod validation;
