pub mod batch;
pub mod dataset;
pub mod model;
pub mod reconstruct;
