pub mod area;
pub mod cell;
pub mod observation;
pub mod table;

pub use area::{Crs, ReferenceArea};
pub use cell::{format_number, Cell};
pub use observation::{Observation, ParsedObservations};
pub use table::Table;
