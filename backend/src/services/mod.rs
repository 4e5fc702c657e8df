pub mod badge_service;
pub mod spin_service;
pub mod task_service;
