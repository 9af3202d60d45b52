use crate::{
    share::{create_tcp_socket, parse_int, split_double_nt_str},
    Conf, MspErr, Protocol,
};
use serde::Serialize;
use std::{
    net::IpAddr,
    time::{Duration, Instant},
};

const LEGACY_REQUEST_PACKET: [u8; 3] = [0xFE, 0x01, 0xFA];
/// Kick packet ID, string length and the UTF-16 `§1\0` prefix.
const LEGACY_HEADER_LEN: usize = 9;
const LEGACY_READ_LIMIT: usize = 512;
/// The 5 values a legacy server returns, in wire order.
const LEGACY_FIELDS: [&str; 5] = [
    "protocol version",
    "version name",
    "description",
    "online players",
    "max players",
];

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyPlayers {
    pub max: i32,
    pub online: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LegacyServer {
    pub ip: IpAddr,
    pub port: u16,
    /// Time from sending the request to receiving the response.
    pub latency: Duration,
    pub description: String,
    pub version: LegacyVersion,
    pub players: LegacyPlayers,
}

impl std::fmt::Display for LegacyServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

/// Server [before 1.7](https://wiki.vg/Server_List_Ping#1.6)
pub fn get_legacy_server_status(conf: &Conf) -> Result<LegacyServer, MspErr> {
    let mut socket = create_tcp_socket(conf)?;
    let ip = socket.peer_ip()?;
    let start = Instant::now();

    socket.write_all(&LEGACY_REQUEST_PACKET)?;

    let bufs = socket.read_available(LEGACY_READ_LIMIT)?;
    let latency = start.elapsed();

    drop(socket);
    tracing::debug!(len = bufs.len(), ?latency, "legacy status received");

    legacy_server_response_process(ip, conf.port, latency, &bufs)
}

pub fn legacy_server_response_process(
    ip: IpAddr,
    port: u16,
    latency: Duration,
    bufs: &[u8],
) -> Result<LegacyServer, MspErr> {
    if bufs.len() <= LEGACY_HEADER_LEN {
        return Err(MspErr::ResponseTooShort(Protocol::StatusLegacy));
    }

    let fields = split_double_nt_str(&bufs[LEGACY_HEADER_LEN..]);

    if fields.len() < LEGACY_FIELDS.len() {
        return Err(MspErr::missing(
            Protocol::StatusLegacy,
            LEGACY_FIELDS[fields.len()],
        ));
    }

    Ok(LegacyServer {
        ip,
        port,
        latency,
        description: fields[2].clone(),
        version: LegacyVersion {
            name: fields[1].clone(),
            protocol: parse_int(LEGACY_FIELDS[0], &fields[0])?,
        },
        players: LegacyPlayers {
            online: parse_int(LEGACY_FIELDS[3], &fields[3])?,
            max: parse_int(LEGACY_FIELDS[4], &fields[4])?,
        },
    })
}
