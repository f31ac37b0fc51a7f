pub mod abbreviations;
pub mod atomic_database;
mod charge;
pub mod composition;
mod count;
mod element;
pub mod errors;
mod mass;
mod mass_number;
