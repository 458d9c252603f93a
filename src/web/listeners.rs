use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;
use tracing::{info, warn};

const BACKLOG: i32 = 1024;

/// Binds the HTTP listener. `*` listens on every interface, preferring an
/// IPv6 dual-stack socket and falling back to IPv4 only.
pub async fn create_listener(host: &str, port: u16) -> std::io::Result<(SocketAddr, TcpListener)> {
    if host == "*" {
        return match bind_wildcard(Domain::IPV6, port) {
            Ok(bound) => Ok(bound),
            Err(e) => {
                warn!("Failed to bind IPv6 listener ({}). Attempting IPv4 only.", e);
                bind_wildcard(Domain::IPV4, port)
            }
        };
    }

    let addr = format!("{}:{}", host, port);
    info!("Attempting to bind server to {}...", addr);

    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;
    Ok((local_addr, listener))
}

fn bind_wildcard(domain: Domain, port: u16) -> std::io::Result<(SocketAddr, TcpListener)> {
    let addr = if domain == Domain::IPV6 {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, port))
    } else {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
    };
    info!("Attempting to bind server to {}...", addr);

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if domain == Domain::IPV6 {
        // Some systems refuse dual-stack; IPv6 alone is still usable
        if let Err(e) = socket.set_only_v6(false) {
            warn!("Failed to set dual-stack mode for IPv6 socket: {}. Continuing anyway.", e);
        }
    }

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    socket.set_nonblocking(true)?;

    let listener = TcpListener::from_std(socket.into())?;
    let local_addr = listener.local_addr()?;
    Ok((local_addr, listener))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_binds_ephemeral_port_on_loopback() {
        let (addr, _listener) = create_listener("127.0.0.1", 0).await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_wildcard_binds_ephemeral_port() {
        let (addr, _listener) = create_listener("*", 0).await.unwrap();
        assert!(addr.ip().is_unspecified());
        assert_ne!(addr.port(), 0);
    }
}
