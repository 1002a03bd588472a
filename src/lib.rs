pub mod check;
pub mod config;
pub mod errors;
pub mod ir;
pub mod library;
pub mod scope;
pub mod symbols;
