//! Host facts reported by the status endpoints.

use std::net::UdpSocket;

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Available memory in bytes, from `/proc/meminfo`.
///
/// `None` on hosts without procfs.
pub fn free_memory() -> Option<u64> {
    let contents = std::fs::read_to_string(MEMINFO_PATH).ok()?;
    parse_mem_available(&contents)
}

fn parse_mem_available(meminfo: &str) -> Option<u64> {
    let line = meminfo
        .lines()
        .find(|line| line.starts_with("MemAvailable:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024)
}

/// Local address the OS would use to reach `backend_url`.
///
/// Connecting a UDP socket only selects a route, nothing is sent.
pub fn local_ip_towards(backend_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(backend_url).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;

    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect((host, port)).ok()?;
    Some(socket.local_addr().ok()?.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mem_available() {
        let meminfo = "MemTotal:       16318480 kB\n\
                       MemFree:         1043220 kB\n\
                       MemAvailable:    8123456 kB\n\
                       Buffers:          312344 kB\n";
        assert_eq!(parse_mem_available(meminfo), Some(8_123_456 * 1024));
    }

    #[test]
    fn test_parse_mem_available_missing() {
        assert_eq!(parse_mem_available("MemTotal: 1 kB\n"), None);
        assert_eq!(parse_mem_available("MemAvailable: lots\n"), None);
    }

    #[test]
    fn test_local_ip_rejects_bad_url() {
        assert_eq!(local_ip_towards("not a url"), None);
    }

    #[test]
    fn test_local_ip_towards_loopback() {
        assert_eq!(
            local_ip_towards("http://127.0.0.1:8080").as_deref(),
            Some("127.0.0.1")
        );
    }
}
