//! Background jobs executed by the job scheduler service.
//!
//! Jobs are designed to be idempotent and fault-tolerant: a failed run simply
//! produces fewer snapshots and alerts, and the next scheduled run catches up.

pub mod snapshot_job;
