pub mod capture;
pub mod dataset;
pub mod margin;
