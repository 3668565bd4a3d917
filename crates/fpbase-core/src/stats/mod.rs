pub mod median;
pub mod rolling;
pub mod weighted;

pub use median::{mad_normal, median};
pub use rolling::rolling_median_centered;
pub use weighted::{clipped_weighted_mean, ClippedStats};
