//! DNS upstream and static-host parsing for dnsroute.
//!
//! Turns the free-form resolver and hosts fields of a policy document into
//! typed values for the forwarder's `forward` and `hosts` stages.
//!
//! ```
//! use dnsroute_dns::{UpstreamGroups, parse_upstreams};
//!
//! let local = parse_upstreams("tls://8.8.8.8 bootstrap=223.5.5.5");
//! let groups = UpstreamGroups::resolve(local, Vec::new(), Vec::new());
//! assert_eq!(groups.local[0].bootstrap.as_deref(), Some("223.5.5.5"));
//! assert_eq!(groups.fallback, groups.local);
//! ```

pub mod hosts;
pub mod upstream;

pub use hosts::{HostEntry, parse_hosts, render_hosts};
pub use upstream::{UpstreamDescriptor, UpstreamGroups, parse_upstream_value, parse_upstreams};
