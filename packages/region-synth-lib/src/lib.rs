pub mod config;
pub mod equivalence;
pub mod logger;
pub mod net;
pub mod properties;
pub mod region;
pub mod separation;
pub mod synthesis;
pub mod ts;
pub mod utils;
pub mod validation;
