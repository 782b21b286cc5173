//! Meter, instrument, and trace source names.

pub const TICKER_METER: &str = "ticker";
pub const DICE_ROLLS: &str = "ticker_dice_rolls";
pub const ROLL_COUNT: &str = "ticker_rolls_total";
pub const ROLLS_OBSERVED: &str = "ticker_rolls_observed_total";

pub const SYSTEM_METER: &str = "system";
pub const DISK_FREE_BYTES: &str = "system_disk_free_bytes";
