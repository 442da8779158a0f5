//! Database models and DTOs shared by the server and the matrix client.

pub mod advertiser;
pub mod bulk;
pub mod filter;
pub mod matrix;
pub mod pagination;
pub mod rule;
pub mod site;
