//! Host listening-socket lookup.
//!
//! On Linux the kernel socket tables under `/proc/net` are read directly. Where
//! those tables are unavailable the port is probed by binding to it. Either way
//! the answer is only valid at the moment it was taken.

use crate::domain::ports::ListenerTable;
use crate::utils::error::Result;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, TcpListener};
use std::path::PathBuf;

const TCP_LISTEN_STATE: &str = "0A";

#[derive(Debug, Clone)]
pub struct SystemListenerTable {
    tables: Vec<PathBuf>,
}

impl SystemListenerTable {
    pub fn new() -> Self {
        Self::with_tables(vec![
            PathBuf::from("/proc/net/tcp"),
            PathBuf::from("/proc/net/tcp6"),
        ])
    }

    pub fn with_tables(tables: Vec<PathBuf>) -> Self {
        Self { tables }
    }

    /// `None` when none of the tables could be read.
    fn listening_ports(&self) -> Option<HashSet<u16>> {
        let mut ports = HashSet::new();
        let mut read_any = false;

        for table in &self.tables {
            match std::fs::read_to_string(table) {
                Ok(content) => {
                    read_any = true;
                    ports.extend(parse_proc_net_listeners(&content));
                }
                Err(e) => {
                    tracing::debug!("Cannot read {}: {}", table.display(), e);
                }
            }
        }

        read_any.then_some(ports)
    }
}

impl Default for SystemListenerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerTable for SystemListenerTable {
    fn is_listening(&self, port: u16) -> Result<bool> {
        match self.listening_ports() {
            Some(ports) => Ok(ports.contains(&port)),
            None => bind_probe(port),
        }
    }
}

/// Ports in LISTEN state from a `/proc/net/tcp` or `/proc/net/tcp6` table.
pub fn parse_proc_net_listeners(content: &str) -> HashSet<u16> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let local = fields.nth(1)?;
            let state = fields.nth(1)?;
            if state != TCP_LISTEN_STATE {
                return None;
            }
            let (_, port_hex) = local.rsplit_once(':')?;
            u16::from_str_radix(port_hex, 16).ok()
        })
        .collect()
}

fn bind_probe(port: u16) -> Result<bool> {
    match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == ErrorKind::AddrInUse => Ok(true),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TCP_TABLE: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:1388 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 31337 1 0000000000000000 100 0 0 10 0
   1: 0100007F:0050 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 31338 1 0000000000000000 100 0 0 10 0
   2: 0100007F:9C40 0100007F:1388 01 00000000:00000000 00:00000000 00000000  1000        0 31339 1 0000000000000000 20 4 30 10 -1
";

    const TCP6_TABLE: &str = "  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000000000000000000000000000:6989 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 4242 1 0000000000000000 100 0 0 10 0
";

    #[test]
    fn test_parse_only_listening_sockets() {
        let ports = parse_proc_net_listeners(TCP_TABLE);
        assert_eq!(ports, HashSet::from([5000, 80]));
        // 40000 is an established client connection, not a listener
        assert!(!ports.contains(&40000));
    }

    #[test]
    fn test_parse_ipv6_table() {
        assert_eq!(parse_proc_net_listeners(TCP6_TABLE), HashSet::from([27017]));
    }

    #[test]
    fn test_table_lookup_from_files() {
        let mut tcp = NamedTempFile::new().unwrap();
        tcp.write_all(TCP_TABLE.as_bytes()).unwrap();
        let mut tcp6 = NamedTempFile::new().unwrap();
        tcp6.write_all(TCP6_TABLE.as_bytes()).unwrap();

        let table = SystemListenerTable::with_tables(vec![
            tcp.path().to_path_buf(),
            tcp6.path().to_path_buf(),
            PathBuf::from("/nonexistent/tcp"),
        ]);

        assert!(table.is_listening(5000).unwrap());
        assert!(table.is_listening(27017).unwrap());
        assert!(!table.is_listening(8080).unwrap());
    }

    #[test]
    fn test_detects_live_listener() {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(SystemListenerTable::new().is_listening(port).unwrap());
    }

    #[test]
    fn test_bind_probe_fallback() {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let table = SystemListenerTable::with_tables(vec![PathBuf::from("/nonexistent/tcp")]);
        assert!(table.is_listening(port).unwrap());

        drop(listener);
        assert!(!table.is_listening(port).unwrap());
    }
}
