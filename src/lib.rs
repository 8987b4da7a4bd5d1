pub mod config;
pub mod database;
pub mod global;
pub mod http;
pub mod scheduler;
pub mod subscriptions;

#[cfg(test)]
mod test_support;
