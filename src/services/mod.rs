//! Business logic services.

pub mod bulk;
pub mod catalog;
pub mod dashboard;
pub mod rule_store;
pub mod site;
