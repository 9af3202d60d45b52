use crate::{
    share::{create_tcp_socket, ModInfo, ModPlugin, TcpConn},
    varint::{decode_varint, decode_varint_from_reader, encode_varint},
    Conf, MspErr, Protocol,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    net::IpAddr,
    time::{Duration, Instant},
};

/// Handshake packet ID, also the status request packet ID.
const PACKET_ID: u8 = 0x00;
/// Advertised client protocol version (1.8). Any valid version works for status.
const PROTOCOL_VERSION: u8 = 47;
/// Next state `1` asks for status instead of login.
const NEXT_STATE: u8 = 1;
/// Status request: packet length 1, packet ID 0.
const STATUS_REQUEST_PACKET: [u8; 2] = [NEXT_STATE, PACKET_ID];
/// Ping packet echoed verbatim by the server as pong.
const PING_PACKET: [u8; 10] = [0x09, 0x01, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07];
/// Packets cannot be larger than 2^21 - 1 bytes.
const MAX_PACKET_SIZE: usize = 2_097_151;

/// Regular Server info type.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Server {
    /// Resolved address of the server that answered.
    pub ip: IpAddr,
    /// Server port.
    pub port: u16,
    /// Ping/pong round trip.
    pub latency: Duration,
    /// Server description as pretty-printed JSON, whether the server sent a
    /// plain string or a rich-text component.
    pub description: String,
    /// Server icon, base64 encoding. Empty when not sent.
    pub favicon: String,
    /// Server version. Includes version name and protocol number.
    pub version: Version,
    /// Server Player info.
    pub players: Players,
    /// Mod loader and mod list advertised under `modinfo`.
    pub mod_info: ModInfo,
    /// Forge plugin server unique information, including mod and channel info.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forge_data: Option<ForgeData>,
    /// Whether the server enables enforces secure chat, default is false.
    pub enforces_secure_chat: bool,
}

impl std::fmt::Display for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

impl Server {
    /// Flatten the description into plain text (`text` then every `extra`, depth first).
    pub fn description_text(&self) -> String {
        let mut text = String::new();

        if let Ok(value) = serde_json::from_str::<Value>(&self.description) {
            flatten_chat(&value, &mut text);
        }

        text
    }
}

fn flatten_chat(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(items) => items.iter().for_each(|item| flatten_chat(item, out)),
        Value::Object(map) => {
            if let Some(text) = map.get("text") {
                flatten_chat(text, out);
            }

            if let Some(extra) = map.get("extra") {
                flatten_chat(extra, out);
            }
        }
        _ => {}
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub name: String,
    pub protocol: i32,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Players {
    pub max: i32,
    pub online: i32,
    pub sample: Vec<Player>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Player {
    pub name: String,
    pub id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ForgeData {
    pub mods: Vec<ForgeMod>,
    pub channels: Vec<ForgeChannel>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ForgeMod {
    #[serde(rename = "modId")]
    pub mod_id: String,
    pub modmarker: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ForgeChannel {
    pub res: String,
    pub version: String,
    pub required: bool,
}

/// Everything is optional here; mandatory fields are checked in
/// [validate_status] before a [Server] is built.
#[derive(Deserialize, Debug)]
struct RawStatus {
    description: Option<Value>,
    players: Option<RawPlayers>,
    version: Option<RawVersion>,
    favicon: Option<String>,
    modinfo: Option<RawModInfo>,
    #[serde(rename = "forgeData")]
    forge_data: Option<ForgeData>,
    #[serde(rename = "enforcesSecureChat")]
    enforces_secure_chat: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct RawPlayers {
    max: Option<i32>,
    online: Option<i32>,
    sample: Option<Vec<Player>>,
}

#[derive(Deserialize, Debug)]
struct RawVersion {
    name: Option<String>,
    protocol: Option<i32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawModInfo {
    #[serde(rename = "type")]
    mod_type: String,
    #[serde(rename = "modList")]
    mod_list: Vec<RawMod>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawMod {
    modid: String,
    version: String,
}

/// Mandatory fields promoted out of a [RawStatus].
struct ValidStatus {
    description: Value,
    max: i32,
    online: i32,
    version_name: String,
    version_protocol: i32,
}

pub fn get_server_status(conf: &Conf) -> Result<Server, MspErr> {
    let (ip, response, latency) = exchange(conf)?;

    parse_status_response(ip, conf.port, latency, &response)
}

/// Ping/pong round trip of a server whose status response is also valid.
pub fn get_server_ping(conf: &Conf) -> Result<Duration, MspErr> {
    get_server_status(conf).map(|server| server.latency)
}

/// Handshake, status request, status response, ping/pong. The connection is
/// reset when this returns, whatever the outcome.
fn exchange(conf: &Conf) -> Result<(IpAddr, Vec<u8>, Duration), MspErr> {
    let mut socket = create_tcp_socket(conf)?;
    let ip = socket.peer_ip()?;
    let request = [
        build_handshake_packet(&conf.host, conf.port),
        STATUS_REQUEST_PACKET.to_vec(),
    ]
    .concat();

    socket.write_all(&request)?;

    let declared_size = decode_varint_from_reader(&mut socket.reader())?;
    let size = match usize::try_from(declared_size) {
        Ok(size) if size <= MAX_PACKET_SIZE => size,
        _ => return Err(MspErr::InvalidSizeInfo),
    };

    tracing::debug!(size, "reading status response");

    let response = socket.read_exact(size)?;
    let latency = measure_latency(&mut socket)?;

    tracing::debug!(?latency, "status exchange finished");

    Ok((ip, response, latency))
}

/// Build handshake packet buffer.
///
/// `varint(len) | 0x00 | 47 | varint(host len) host | port (u16 BE) | 1`
pub fn build_handshake_packet(host: &str, port: u16) -> Vec<u8> {
    let server_addr_bytes = host.as_bytes();
    let mut packet_data = Vec::<u8>::with_capacity(server_addr_bytes.len() + 10);

    packet_data.push(PACKET_ID);
    // See protocol version [numbers](https://wiki.vg/Protocol_version_numbers).
    packet_data.push(PROTOCOL_VERSION);
    // UTF-8 string prefixed with its size in bytes as a VarInt.
    packet_data.extend(encode_varint(server_addr_bytes.len() as u64));
    packet_data.extend_from_slice(server_addr_bytes);
    packet_data.extend_from_slice(&port.to_be_bytes());
    packet_data.push(NEXT_STATE);

    // Build [packet](https://wiki.vg/Protocol#Packet_format)
    let mut packet = encode_varint(packet_data.len() as u64);
    packet.append(&mut packet_data);

    packet
}

fn measure_latency(socket: &mut TcpConn) -> Result<Duration, MspErr> {
    let start = Instant::now();

    socket.write_all(&PING_PACKET)?;

    let pong = socket.read_exact(PING_PACKET.len())?;
    let latency = start.elapsed();

    if pong != PING_PACKET {
        tracing::debug!(?pong, "pong mismatch");
        return Err(MspErr::InvalidPong);
    }

    Ok(latency)
}

/// Strip the packet ID and the JSON length prefix, checking the prefix
/// against what is actually left.
fn format_status_response(response: &[u8]) -> Result<&[u8], MspErr> {
    if response.len() < 4 {
        return Err(MspErr::ResponseTooShort(Protocol::Status));
    }

    let response = &response[1..];
    let (json_len, varint_len) = decode_varint(response)?;
    let json = &response[varint_len..];

    if json_len != json.len() as u64 {
        tracing::debug!(json_len, actual = json.len(), "status size mismatch");
        return Err(MspErr::InvalidSizeInfo);
    }

    Ok(json)
}

fn validate_status(raw: &mut RawStatus) -> Result<ValidStatus, MspErr> {
    let missing = |field: &str| MspErr::missing(Protocol::Status, field);

    let description = raw.description.take().ok_or_else(|| missing("description"))?;
    let players = raw.players.as_ref();
    let max = players
        .and_then(|p| p.max)
        .ok_or_else(|| missing("max players"))?;
    let online = players
        .and_then(|p| p.online)
        .ok_or_else(|| missing("online players"))?;
    let version = raw.version.as_mut();
    let version_name = version
        .and_then(|v| v.name.take())
        .ok_or_else(|| missing("version name"))?;
    let version_protocol = raw
        .version
        .as_ref()
        .and_then(|v| v.protocol)
        .ok_or_else(|| missing("version protocol"))?;

    Ok(ValidStatus {
        description,
        max,
        online,
        version_name,
        version_protocol,
    })
}

/// Turn a status response payload (packet ID onwards) into a [Server].
pub fn parse_status_response(
    ip: IpAddr,
    port: u16,
    latency: Duration,
    response: &[u8],
) -> Result<Server, MspErr> {
    let json = format_status_response(response)?;
    let mut raw = serde_json::from_slice::<RawStatus>(json)?;
    let valid = validate_status(&mut raw)?;
    let mod_info = raw
        .modinfo
        .map(|info| ModInfo {
            mod_type: info.mod_type,
            mod_list: info
                .mod_list
                .into_iter()
                .map(|m| ModPlugin {
                    name: m.modid,
                    version: m.version,
                })
                .collect(),
        })
        .unwrap_or_default();

    Ok(Server {
        ip,
        port,
        latency,
        description: serde_json::to_string_pretty(&valid.description)?,
        favicon: raw.favicon.unwrap_or_default(),
        version: Version {
            name: valid.version_name,
            protocol: valid.version_protocol,
        },
        players: Players {
            max: valid.max,
            online: valid.online,
            sample: raw
                .players
                .and_then(|p| p.sample)
                .unwrap_or_default(),
        },
        mod_info,
        forge_data: raw.forge_data,
        enforces_secure_chat: raw.enforces_secure_chat.unwrap_or(false),
    })
}
