pub mod preprocessing;
pub mod regions;
pub mod morphology;
pub mod extraction;
pub mod filtering;
pub mod metrics;
pub mod aggregation;
pub mod overlay;

pub use preprocessing::*;
pub use regions::*;
pub use morphology::*;
pub use extraction::*;
pub use filtering::*;
pub use metrics::*;
pub use aggregation::*;
pub use overlay::*;
