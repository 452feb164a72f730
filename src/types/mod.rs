//! Type definitions

pub mod import;
pub mod master_data;
pub mod messages;

pub use import::*;
pub use master_data::*;
pub use messages::*;
