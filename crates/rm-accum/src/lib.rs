//! `rm-accum` - single-pass statistics accumulators for region-measure.
//!
//! Every accumulator is updated one sample at a time, keeps O(1) state
//! (O(d) for moments), and can be merged with another accumulator of the
//! same kind.

pub mod directional;
pub mod minmax;
pub mod moments;
pub mod statistics;
pub mod variance;

pub use directional::DirectionalStatisticsAccumulator;
pub use minmax::{MinMaxAccumulator, PositionAccumulator};
pub use moments::MomentAccumulator;
pub use statistics::StatisticsAccumulator;
pub use variance::VarianceAccumulator;
