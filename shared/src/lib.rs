pub mod badges;
pub mod constants;
pub mod daily_tasks;
pub mod draw;
pub mod reward;
pub mod spin_api;
pub mod wallet;
pub mod wheel;

pub use draw::{draw, draw_at, DrawError, Drawn};
pub use reward::{CatalogError, Rarity, Reward, RewardCatalog, RewardRow};
