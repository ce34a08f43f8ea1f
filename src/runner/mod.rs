//! The two child-running strategies the supervisor core uses: one synchronous
//! with optional fatal escalation, one asynchronous with auto-restart.

pub mod blocking;
pub mod forked;
