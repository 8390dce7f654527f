pub mod action;
pub mod best_case;
pub mod config;
pub mod experience;
pub mod policy;
pub mod portfolio;
pub mod state;
pub mod trainer;
pub mod value_table;
