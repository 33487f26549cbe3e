pub mod proximity_filter;
pub mod reference_merger;
pub mod selection;
pub mod unpacker;

pub use proximity_filter::{ProximityFilter, ProximityOutcome};
pub use reference_merger::ReferenceMerger;
pub use selection::{filter_city, select_columns};
pub use unpacker::{TidyUnpacker, UnpackReport};
