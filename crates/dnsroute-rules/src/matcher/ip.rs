//! Response-address matcher.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

/// Networks from `ip:` / CIDR entries; single addresses become host routes.
#[derive(Debug, Default)]
pub struct CidrMatcher {
    v4: Vec<Ipv4Net>,
    v6: Vec<Ipv6Net>,
}

impl CidrMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, net: IpNet) {
        match net {
            IpNet::V4(n) => self.v4.push(n.trunc()),
            IpNet::V6(n) => self.v6.push(n.trunc()),
        }
    }

    pub fn insert_addr(&mut self, addr: IpAddr) {
        let prefix = if addr.is_ipv4() { 32 } else { 128 };
        if let Ok(net) = IpNet::new(addr, prefix) {
            self.insert(net);
        }
    }

    /// Sort and drop duplicate networks.
    pub fn finish(mut self) -> Self {
        self.v4.sort();
        self.v4.dedup();
        self.v6.sort();
        self.v6.dedup();
        self
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.contains_v4(v4),
            IpAddr::V6(v6) => self.contains_v6(v6),
        }
    }

    fn contains_v4(&self, addr: Ipv4Addr) -> bool {
        self.v4.iter().any(|net| net.contains(&addr))
    }

    fn contains_v6(&self, addr: Ipv6Addr) -> bool {
        // v4-mapped answers are checked against the v4 table too
        if let Some(v4) = addr.to_ipv4_mapped()
            && self.contains_v4(v4)
        {
            return true;
        }
        self.v6.iter().any(|net| net.contains(&addr))
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }
}
