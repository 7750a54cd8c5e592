use crate::error::{ActionError, Result};
use std::net::{Ipv4Addr, SocketAddr, TcpListener};

/// Loopback ports for one backend instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendPorts {
    pub main: u16,
    pub health: u16,
}

impl BackendPorts {
    pub fn main_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.main))
    }

    pub fn health_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.health))
    }
}

/// Ask the OS for two free loopback ports.
///
/// Both listeners are held until both ports are known, so the two values
/// always differ. They are released on return; another process can still
/// claim a port before the backend binds it.
pub fn allocate() -> Result<BackendPorts> {
    let main = bind_ephemeral()?;
    let health = bind_ephemeral()?;
    let ports = BackendPorts {
        main: local_port(&main)?,
        health: local_port(&health)?,
    };
    tracing::debug!(main = ports.main, health = ports.health, "allocated backend ports");
    Ok(ports)
}

fn bind_ephemeral() -> Result<TcpListener> {
    TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .map_err(|e| ActionError::Provisioning(format!("failed to reserve a local port: {e}")))
}

fn local_port(listener: &TcpListener) -> Result<u16> {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| ActionError::Provisioning(format!("failed to read local port: {e}")))
}
