pub mod adapters;
pub mod config;
pub mod core;
pub mod storage;

#[cfg(test)]
mod tests;
