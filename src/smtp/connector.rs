use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;

use super::error::SessionError;
use crate::resolver::DnsLookup;

/// An open byte stream to a mail server plus a printable peer address.
pub struct Connected<S> {
    pub stream: S,
    pub peer: String,
}

/// Opens transport connections to mail servers. Every call must return a
/// fresh connection: sessions are never reused.
pub trait Connector {
    type Stream: Read + Write;

    fn connect(&self, host: &str) -> Result<Connected<Self::Stream>, SessionError>;
}

/// Plain TCP on port 25 (by default), with connect and per-read/write
/// timeouts. Host names go through the same resolver as MX lookups.
pub struct TcpConnector<R> {
    resolver: R,
    port: u16,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl<R: DnsLookup> TcpConnector<R> {
    pub fn new(
        resolver: R,
        port: u16,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            port,
            connect_timeout,
            response_timeout,
        }
    }

    fn addresses(&self, host: &str) -> Result<Vec<IpAddr>, SessionError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        let addrs = self
            .resolver
            .host_addresses(host)
            .map_err(|source| SessionError::HostLookup {
                host: host.to_string(),
                source,
            })?;
        if addrs.is_empty() {
            return Err(SessionError::NoAddress {
                host: host.to_string(),
            });
        }
        Ok(addrs)
    }
}

impl<R: DnsLookup> Connector for TcpConnector<R> {
    type Stream = TcpStream;

    fn connect(&self, host: &str) -> Result<Connected<TcpStream>, SessionError> {
        let mut last_err = None;
        for ip in self.addresses(host)? {
            let addr = SocketAddr::new(ip, self.port);
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.response_timeout))
                        .map_err(|source| SessionError::Io { source })?;
                    stream
                        .set_write_timeout(Some(self.response_timeout))
                        .map_err(|source| SessionError::Io { source })?;
                    debug!(host, %addr, "connected");
                    return Ok(Connected {
                        stream,
                        peer: addr.to_string(),
                    });
                }
                Err(source) => {
                    debug!(host, %addr, error = %source, "connect failed");
                    last_err = Some(SessionError::Connect {
                        addr: addr.to_string(),
                        source,
                    });
                }
            }
        }
        Err(last_err.unwrap_or_else(|| SessionError::NoAddress {
            host: host.to_string(),
        }))
    }
}
