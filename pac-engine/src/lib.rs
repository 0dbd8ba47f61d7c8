//! Proxy auto-config evaluation: run a PAC script in a sandbox and turn its
//! answer into an ordered list of proxies

pub mod clock;
pub mod config;
pub mod directive;
pub mod error;
pub mod helpers;
pub mod script;
pub mod selector;
pub mod source;

// Re-export commonly used types
pub use clock::{Clock, ClockSource, FixedClock, SystemClock};
pub use config::{Config, ConfigLoader, ConfigValidator, PacConfig, SandboxLimits};
pub use directive::{parse_directives, ProxyAddress, ProxyDirective, ProxyList};
pub use error::{PacError, Result, ValidationError};
pub use helpers::{HostResolver, SystemResolver};
pub use script::{PacScript, SandboxOptions, ScriptHost};
pub use selector::{PacSelector, PacSelectorBuilder, ScriptOrigin, Selection};
pub use source::PacLocation;
