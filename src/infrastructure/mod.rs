//! Infrastructure module for external services.
//!
//! This module contains the environment configuration and the HTTP client
//! capability used to reach the upstream profile and search services.

pub mod config;
pub mod upstream;

pub use config::{ConfigError, EnvParseError, LogFormat, ServerConfig, UpstreamConfig};
pub use upstream::{
    ReqwestUpstreamClient, ScriptedReply, StubUpstreamClient, TransportError, UpstreamClient,
    UpstreamRequest, UpstreamResponse,
};
