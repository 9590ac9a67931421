pub mod index;
pub mod stats;

pub use index::{FlatL2Index, Neighbor};
pub use stats::{RunStats, RunStatus, StatsLog};

pub mod prelude {
    pub use super::index::{FlatL2Index, Neighbor};
    pub use super::stats::{RunStats, RunStatus, StatsLog, HEADERS};
}
