pub mod area_reader;
pub mod reference_reader;
pub mod table_reader;

pub use area_reader::AreaReader;
pub use reference_reader::ReferenceReader;
pub use table_reader::TableReader;
