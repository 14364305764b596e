//! API gateway client.

mod gateway;
mod hooks;

pub use gateway::ApiClient;
pub use hooks::error_message;
