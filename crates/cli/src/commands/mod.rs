//! Command handlers.

pub mod crypt;
pub mod values;
