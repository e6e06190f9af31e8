pub mod common;
pub mod model;
pub mod model_store;
pub mod node;
pub mod pod;
pub mod scheduler;
