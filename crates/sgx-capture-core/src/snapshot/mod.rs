pub mod dataset;
pub mod labels;
