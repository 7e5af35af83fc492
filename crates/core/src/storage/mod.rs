pub mod lock;
pub mod recommendations;

pub use lock::{UpdateGuard, UpdateLease};
pub use recommendations::RecommendationStore;
