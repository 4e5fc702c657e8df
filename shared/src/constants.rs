// Spin wheel
pub const SPIN_COST_KEYS: i64 = 1;
pub const KITTY_KEYS_PER_CLAIM: i64 = 1;

// Wheel animation (degrees / milliseconds)
pub const FULL_TURN_DEG: f64 = 360.0;
pub const MIN_EXTRA_TURNS: u32 = 4;
pub const MAX_EXTRA_TURNS: u32 = 7;
pub const BASE_SPIN_DURATION_MS: u32 = 3000;
pub const MAX_SPIN_DURATION_VARIATION_MS: u32 = 500;
pub const DURATION_VARIATION_DISTANCE_DEG: f64 = 1800.0;
/// Rotations beyond this are folded back into one turn before planning.
pub const MAX_CONTINUOUS_ROTATION_DEG: f64 = FULL_TURN_DEG * 1_000_000.0;
pub const ANTICIPATION_BACKSWING_DEG: f64 = 15.0;
pub const ANTICIPATION_DURATION_MS: u32 = 200;
pub const SPIN_EASING: &str = "cubic-bezier(0.25, 0.46, 0.45, 0.94)";

// Catalog
pub const DEFAULT_REWARD_COLOR: &str = "#FFB6C1";

pub const NO_KITTY_KEYS_ERROR: &str = "Kitty Key tidak cukup!";
pub const CLAIM_SUCCESS_MESSAGE: &str = "Kitty Key diklaim! Sekarang kamu bisa memutar roda beruntung!";
pub const TASKS_REMAINING_ERROR: &str = "Selesaikan semua tugas harian untuk mengklaim Kitty Key";
pub const ALREADY_CLAIMED_ERROR: &str = "Kitty Key hari ini sudah diklaim";

// Badge store
pub const INSUFFICIENT_COINS_ERROR: &str = "Koin tidak cukup!";
pub const BADGE_ALREADY_OWNED_ERROR: &str = "Badge ini sudah kamu miliki";
pub const BADGE_NOT_FOR_SALE_ERROR: &str = "Badge ini tidak dijual";
