pub mod geo;
pub mod seed;
pub mod stats;
