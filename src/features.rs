pub mod builder;
pub mod indicator;
