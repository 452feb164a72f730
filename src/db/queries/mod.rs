//! Database queries

pub mod master_data;
pub mod vessel;
