pub mod classifier;
pub mod indicator;
pub mod report;
pub mod scorer;
pub mod system;
