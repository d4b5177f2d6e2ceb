use crate::record::UNKNOWN_NODE_ID;
use std::net::{IpAddr, Ipv4Addr};

/// Stable identifier for a client node: `pi-<last IPv4 octet>` when a
/// non-loopback IPv4 address is available, the hostname otherwise.
pub fn derive_node_id() -> String {
    if let Some(addr) = primary_ipv4() {
        return from_ipv4(addr);
    }
    match hostname() {
        Some(name) => name,
        None => {
            tracing::warn!("no usable address or hostname; node id falls back to unknown");
            UNKNOWN_NODE_ID.to_string()
        }
    }
}

pub fn from_ipv4(addr: Ipv4Addr) -> String {
    format!("pi-{}", addr.octets()[3])
}

fn primary_ipv4() -> Option<Ipv4Addr> {
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(err) => {
            tracing::debug!(error = %err, "failed to enumerate interfaces");
            return None;
        }
    };
    interfaces
        .iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.ip() {
            IpAddr::V4(v4) if !v4.is_unspecified() && !v4.is_link_local() => Some(v4),
            _ => None,
        })
}

fn hostname() -> Option<String> {
    sysinfo::System::host_name()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_last_octet() {
        assert_eq!(from_ipv4(Ipv4Addr::new(192, 168, 1, 42)), "pi-42");
        assert_eq!(from_ipv4(Ipv4Addr::new(10, 0, 0, 7)), "pi-7");
    }

    #[test]
    fn derived_id_is_never_empty() {
        assert!(!derive_node_id().is_empty());
    }

    #[test]
    fn hostname_is_trimmed_when_present() {
        if let Some(name) = hostname() {
            assert!(!name.is_empty());
            assert_eq!(name, name.trim());
        }
    }
}
