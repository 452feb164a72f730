//! Business logic services

pub mod bulk_import;
