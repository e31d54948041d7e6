#[macro_use]
pub mod common;
pub mod config;
pub mod data;
pub mod errors;
pub mod estimate;
pub mod network;
pub mod render;
pub mod report;

pub use config::{build_network, AnalysisConfig};
pub use data::{derive_columns, load_csv, ObservationTable, Schema, Value};
pub use estimate::{estimate, probability, Cpt, CptRequest, MissingParentPolicy};
pub use network::{Bbn, BbnNode, EvidenceBuilder, InferenceController, JoinTree, Marginal, Variable};
