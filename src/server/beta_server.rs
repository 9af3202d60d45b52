use crate::{
    share::{bufs_to_utf16_str, create_tcp_socket, TcpConn},
    Conf, MspErr,
};
use serde::Serialize;
use std::{
    net::IpAddr,
    time::{Duration, Instant},
};

const BETA_REQUEST_PACKET: u8 = 0xFE;
/// Kick packet ID followed by a big-endian u16 length.
const BETA_HEADER_LEN: usize = 3;

/// Status of a server in beta release (beta 1.8 to 1.3).
///
/// Only the framing is decoded. The payload is kept as received so callers
/// can apply their own field layout; [BetaServer::payload_text] gives the
/// UTF-16 text without splitting it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BetaServer {
    pub ip: IpAddr,
    pub port: u16,
    /// Time from sending the request to receiving the full payload.
    pub latency: Duration,
    /// Raw payload, `declared length * 2` bytes.
    pub payload: Vec<u8>,
}

impl std::fmt::Display for BetaServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

impl BetaServer {
    /// Decode the payload as UTF-16BE text.
    pub fn payload_text(&self) -> Result<String, MspErr> {
        bufs_to_utf16_str(&self.payload)
    }
}

pub fn get_beta_server_status(conf: &Conf) -> Result<BetaServer, MspErr> {
    let mut socket = create_tcp_socket(conf)?;
    let ip = socket.peer_ip()?;
    let start = Instant::now();

    socket.write_all(&[BETA_REQUEST_PACKET])?;

    let payload = read_beta_payload(&mut socket)?;
    let latency = start.elapsed();

    tracing::debug!(len = payload.len(), ?latency, "beta status received");

    Ok(BetaServer {
        ip,
        port: conf.port,
        latency,
        payload,
    })
}

fn read_beta_payload(socket: &mut TcpConn) -> Result<Vec<u8>, MspErr> {
    let header = socket.read_exact(BETA_HEADER_LEN)?;
    let size = beta_payload_size(&header);

    tracing::trace!(size, "beta payload size");

    socket.read_exact(size)
}

/// The length counts UTF-16 code units, not bytes, hence the doubling.
fn beta_payload_size(header: &[u8]) -> usize {
    u16::from_be_bytes([header[1], header[2]]) as usize * 2
}
