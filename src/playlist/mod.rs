pub mod config;
pub mod filters;
pub mod generator;
pub mod mood;


pub use config::*;
pub use generator::*;
pub use mood::*;
