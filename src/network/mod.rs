pub mod dag;
pub mod evidence;
pub mod inference;
pub mod jointree;
pub mod potential;
pub mod variable;

pub use dag::Bbn;
pub use evidence::{Evidence, EvidenceBuilder, EvidenceType};
pub use inference::InferenceController;
pub use jointree::{Clique, JoinTree, Marginal, SepSet};
pub use potential::Potential;
pub use variable::{BbnNode, Variable};
