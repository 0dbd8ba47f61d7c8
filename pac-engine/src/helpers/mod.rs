//! The Netscape PAC helper vocabulary
//!
//! Every function here is total: malformed input produces `false` or an
//! empty string, never an error, so one bad call cannot abort a script.

pub mod host;
pub mod net;
pub mod time;

pub use host::{
    dns_domain_is, dns_domain_levels, is_plain_host_name, local_host_or_domain_is, sh_exp_match,
};
pub use net::{
    dns_resolve, is_in_net, is_resolvable, my_ip_address, HostResolver, SystemResolver,
};
pub use time::{date_range, time_range, weekday_range, RangeArg};

/// `alert(message)`: browsers send this to the console, we send it to the log
pub fn alert(message: &str) {
    tracing::info!(target: "pac::alert", "{}", message);
}
