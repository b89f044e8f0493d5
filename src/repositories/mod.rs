pub mod meters;
pub mod readings;

pub use meters::{MeterRepository, MeterSource};
pub use readings::{ReadingRepository, ReadingSource};
