#![doc = include_str!("../README.md")]

pub mod adapter;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod report;
pub mod runner;
#[cfg(unix)]
mod signal;
pub mod tunnel;

pub use adapter::{
    BackendAdapter, BollardRuntime, ContainerAdapter, ContainerRuntime, DynBackendAdapter,
    HttpAdapter, PollStatus, ProcessAdapter, ScanHandle, TriggerOptions,
};
pub use descriptor::{AdapterFactory, BackendDescriptor};
pub use engine::DispatchEngine;
pub use error::{AdapterError, ScanError};
pub use report::{OutcomeTally, SessionReport};
pub use runner::{ScanRequest, ScanRunner, TUNNEL_META_KEY};
pub use tunnel::{IpLinkProbe, LinkProbe, TunnelGuard, TunnelManager};
