pub mod derive;
pub mod loader;
pub mod table;

pub use derive::{derive_columns, Discretizer};
pub use loader::{load_csv, read_csv, ColumnKind, ColumnSpec, Schema};
pub use table::{ObservationTable, Value};
