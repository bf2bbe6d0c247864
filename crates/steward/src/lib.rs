pub mod server;

pub mod error;
pub mod config;
pub mod core;
pub mod event;

pub mod command;
pub mod capability;
pub mod routing;
pub mod builtins;
pub mod schedule;
pub mod relay;
pub mod supervisor;
pub mod listen;
pub mod bus;
pub mod utils;

pub use crate::capability::{Capability, CapabilityRegistry, CapabilityResult, FailureKind};
pub use crate::command::{CommandRequest, Origin};
pub use crate::config::Config;
pub use crate::core::Core;
pub use crate::error::{CoreError, CoreResult};
pub use crate::supervisor::{Supervisor, SupervisorState};
