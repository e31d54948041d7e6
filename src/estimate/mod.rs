pub mod frequency;

pub use frequency::{estimate, probability, Cpt, CptRequest, MissingParentPolicy};
