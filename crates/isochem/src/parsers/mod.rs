pub mod errors;
pub mod formula;
pub mod primitives;
