pub mod alert_service;
pub mod deal_service;
pub mod job_scheduler_service;
pub mod notifier;
pub mod snapshot_service;
