pub mod landmark;
pub mod normalize;

pub use landmark::{Landmark, LandmarkIndex, LandmarkSet};
pub use normalize::Normalizer;
