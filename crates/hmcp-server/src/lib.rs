pub mod agent;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod protocol;
pub mod server;

pub use agent::{AgentServer, SamplingContext, SamplingHandler, UnsupportedSampling};
pub use config::{AgentConfig, AppConfig, LoggingConfig, ServerConfig};
pub use observability::{init_tracing, set_log_level};
pub use server::{AppState, HmcpServer, ServerBuilder, build_app, build_auth_state};
