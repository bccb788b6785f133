pub mod access;
pub mod registry;
