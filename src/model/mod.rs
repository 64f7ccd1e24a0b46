pub mod indices;
pub mod priors;
pub mod sparse;
pub mod transform;
