pub mod badges;
pub mod daily_tasks;
pub mod spin_wheel;
