use crate::{
    share::{
        create_udp_socket, parse_int, split_nt_kv, split_nt_str, split_on_token, ModInfo,
        ModPlugin,
    },
    Conf, MspErr, Protocol,
};
use rand::Rng;
use serde::Serialize;
use std::{
    collections::HashMap,
    net::{IpAddr, UdpSocket},
    time::{Duration, Instant},
};

const MAGIC_BYTES: [u8; 2] = [0xFE, 0xFD];
const HANDSHAKE_TYPE: u8 = 0x09;
const STAT_TYPE: u8 = 0x00;
const SESSION_ID_MASK: u32 = 0x0F0F0F0F;
/// Full query except the payload must be padded to 8 bytes.
const FULL_QUERY_PADDING: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
/// Separates the K,V section from the player section of a full stat response.
const PLAYER_TOKEN: [u8; 11] = [
    0x00, 0x01, b'p', b'l', b'a', b'y', b'e', b'r', b'_', 0x00, 0x00,
];
/// Type byte and session ID.
const RESPONSE_HEADER_LEN: usize = 5;
/// Type, session ID and the `splitnum\0\x80\0` padding.
const KV_HEADER_LEN: usize = 16;
const CHALLENGE_READ_LIMIT: usize = 32;
const CHALLENGE_MIN_LEN: usize = 7;
const STAT_READ_LIMIT: usize = 8192;
/// Keys every full stat response must carry, in validation order.
const REQUIRED_KEYS: [&str; 8] = [
    "hostname",
    "gametype",
    "game_id",
    "version",
    "plugins",
    "map",
    "numplayers",
    "maxplayers",
];

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryPlayers {
    pub max: i32,
    pub online: i32,
}

/// [Basic stat](https://wiki.vg/Query#Basic_stat) response.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryBasic {
    pub ip: IpAddr,
    pub port: u16,
    /// Stat request round trip.
    pub latency: Duration,
    /// MOTD.
    pub description: String,
    pub game_type: String,
    pub map_name: String,
    pub players: QueryPlayers,
}

impl std::fmt::Display for QueryBasic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryVersion {
    pub name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryFullPlayers {
    pub max: i32,
    pub online: i32,
    /// Names of the players currently online, in server order.
    pub player_list: Vec<String>,
}

/// [Full stat](https://wiki.vg/Query#Full_stat) response.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryFull {
    pub ip: IpAddr,
    pub port: u16,
    pub latency: Duration,
    /// MOTD, sent as `hostname`.
    pub description: String,
    pub game_type: String,
    /// Usually `MINECRAFT`.
    pub game_id: String,
    pub map_name: String,
    pub version: QueryVersion,
    pub players: QueryFullPlayers,
    pub mod_info: ModInfo,
}

impl std::fmt::Display for QueryFull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

/// Client-chosen session ID. Only the low 4 bits of each byte survive the
/// server's echo, so the rest are masked off up front.
fn create_session_id<R: Rng>(rng: &mut R) -> [u8; 4] {
    (rng.gen::<u32>() & SESSION_ID_MASK).to_be_bytes()
}

fn build_handshake_packet(session_id: &[u8; 4]) -> Vec<u8> {
    [MAGIC_BYTES.as_slice(), &[HANDSHAKE_TYPE], session_id].concat()
}

fn build_stat_request_packet(
    session_id: &[u8; 4],
    challenge_token: &[u8; 4],
    full_query: bool,
) -> Vec<u8> {
    let padding: &[u8] = match full_query {
        true => &FULL_QUERY_PADDING,
        false => &[],
    };

    [
        MAGIC_BYTES.as_slice(),
        &[STAT_TYPE],
        session_id,
        challenge_token,
        padding,
    ]
    .concat()
}

/// Process query handshake response [packet](https://wiki.vg/Query#Response),
/// and get challenge token as 4 big-endian bytes.
fn parse_challenge_token(bufs: &[u8]) -> Result<[u8; 4], MspErr> {
    if bufs.len() < CHALLENGE_MIN_LEN {
        return Err(MspErr::ChallengeTokenTooShort);
    }

    // Remove Type and session ID.
    let bufs = &bufs[RESPONSE_HEADER_LEN..];

    if bufs.last() != Some(&0x00) {
        return Err(MspErr::ChallengeTokenMissingTerminator);
    }

    let cleaned = bufs.iter().copied().filter(|&b| b != 0).collect::<Vec<_>>();
    let token_str = String::from_utf8_lossy(&cleaned).into_owned();
    let (negative, digits) = match token_str.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, token_str.as_str()),
    };
    let out_of_range = || MspErr::DataErr(format!("Challenge token out of range: {}", token_str));

    // The sign is handled above, `i64::from_str` would accept a second one.
    if digits.starts_with(['+', '-']) {
        return Err(MspErr::DataErr(format!(
            "Can not parse challenge token `{}`, reason: unexpected sign",
            token_str
        )));
    }

    let magnitude = digits.parse::<i64>().map_err(|err| {
        MspErr::DataErr(format!(
            "Can not parse challenge token `{}`, reason: {}",
            token_str, err
        ))
    })?;
    let value = match negative {
        true => magnitude.checked_neg().ok_or_else(out_of_range)?,
        false => magnitude,
    };

    i32::try_from(value)
        .map(i32::to_be_bytes)
        .map_err(|_| out_of_range())
}

/// Handshake, challenge token, stat request. Returns the raw stat response
/// and the stat request round trip.
fn send_query_request(socket: &UdpSocket, full_query: bool) -> Result<(Vec<u8>, Duration), MspErr> {
    let session_id = create_session_id(&mut rand::thread_rng());

    socket.send(&build_handshake_packet(&session_id))?;

    let mut bufs = [0u8; CHALLENGE_READ_LIMIT];
    let len = socket.recv(&mut bufs)?;
    let challenge_token = parse_challenge_token(&bufs[..len])?;

    if bufs[1..RESPONSE_HEADER_LEN] != session_id {
        tracing::warn!(
            sent = ?session_id,
            received = ?&bufs[1..RESPONSE_HEADER_LEN],
            "query session ID echo mismatch"
        );
    }

    tracing::debug!(?challenge_token, full_query, "sending stat request");

    let mut response = vec![0u8; STAT_READ_LIMIT];
    let start = Instant::now();

    socket.send(&build_stat_request_packet(
        &session_id,
        &challenge_token,
        full_query,
    ))?;

    let len = socket.recv(&mut response)?;
    let latency = start.elapsed();

    response.truncate(len);
    tracing::debug!(len, ?latency, "stat response received");

    Ok((response, latency))
}

/// Get basic [status](https://wiki.vg/Query#Basic_stat)
pub fn query_basic_status(conf: &Conf) -> Result<QueryBasic, MspErr> {
    let socket = create_udp_socket(conf)?;
    let ip = socket.peer_addr()?.ip();
    let (response, latency) = send_query_request(&socket, false)?;

    drop(socket);

    parse_basic_response(ip, conf.port, latency, &response)
}

/// Get full [status](https://wiki.vg/Query#Full_stat)
pub fn query_full_status(conf: &Conf) -> Result<QueryFull, MspErr> {
    let socket = create_udp_socket(conf)?;
    let ip = socket.peer_addr()?.ip();
    let (response, latency) = send_query_request(&socket, true)?;

    drop(socket);

    parse_full_response(ip, conf.port, latency, &response)
}

pub fn parse_basic_response(
    ip: IpAddr,
    port: u16,
    latency: Duration,
    response: &[u8],
) -> Result<QueryBasic, MspErr> {
    if response.len() < RESPONSE_HEADER_LEN {
        return Err(MspErr::ResponseTooShort(Protocol::Query));
    }

    // hostport and hostip follow maxplayers but are not needed.
    let fields = split_nt_str(&response[RESPONSE_HEADER_LEN..]);

    if fields.len() < 5 {
        return Err(MspErr::ResponseTooShort(Protocol::Query));
    }

    Ok(QueryBasic {
        ip,
        port,
        latency,
        description: fields[0].clone(),
        game_type: fields[1].clone(),
        map_name: fields[2].clone(),
        players: QueryPlayers {
            online: parse_int("numplayers", &fields[3])?,
            max: parse_int("maxplayers", &fields[4])?,
        },
    })
}

pub fn parse_full_response(
    ip: IpAddr,
    port: u16,
    latency: Duration,
    response: &[u8],
) -> Result<QueryFull, MspErr> {
    let sections = split_on_token(response, &PLAYER_TOKEN);

    if sections.len() != 2 {
        return Err(MspErr::PlayerTokenMissing);
    }

    let mut kv = parse_kv_section(sections[0])?;

    if let Some(key) = REQUIRED_KEYS.iter().find(|key| !kv.contains_key(**key)) {
        return Err(MspErr::missing(Protocol::Query, key));
    }

    let mut take = |key: &str| kv.remove(key).unwrap_or_default();

    Ok(QueryFull {
        ip,
        port,
        latency,
        players: QueryFullPlayers {
            online: parse_int("numplayers", &take("numplayers"))?,
            max: parse_int("maxplayers", &take("maxplayers"))?,
            player_list: parse_player_section(sections[1]),
        },
        description: take("hostname"),
        game_type: take("gametype"),
        game_id: take("game_id"),
        map_name: take("map"),
        version: QueryVersion {
            name: take("version"),
        },
        mod_info: parse_plugins(&take("plugins")),
    })
}

/// [K, V section](https://wiki.vg/Query#K.2C_V_section). Later duplicates win.
fn parse_kv_section(section: &[u8]) -> Result<HashMap<String, String>, MspErr> {
    if section.len() < KV_HEADER_LEN {
        return Err(MspErr::ResponseTooShort(Protocol::Query));
    }

    Ok(split_nt_kv(&section[KV_HEADER_LEN..]).into_iter().collect())
}

/// Null-terminated names, ending at the first empty one.
fn parse_player_section(section: &[u8]) -> Vec<String> {
    if section.len() < 4 {
        return Vec::new();
    }

    split_nt_str(section)
        .into_iter()
        .take_while(|name| !name.is_empty())
        .collect()
}

/// Plugin format: `[SERVER_MOD_NAME[: PLUGIN_NAME VERSION(; PLUGIN_NAME VERSION...)]]`
pub fn parse_plugins(plugins: &str) -> ModInfo {
    if plugins.is_empty() {
        return ModInfo::default();
    }

    let (mod_type, plugin_list) = match plugins.split_once(": ") {
        Some((mod_type, plugin_list)) => (mod_type, plugin_list),
        None => (plugins, ""),
    };
    let mod_list = match plugin_list {
        "" => Vec::new(),
        list => list
            .split("; ")
            .map(|plugin| match plugin.split_once(' ') {
                Some((name, version)) => ModPlugin {
                    name: name.into(),
                    version: version.split(' ').next().unwrap_or_default().into(),
                },
                None => ModPlugin {
                    name: plugin.into(),
                    version: String::new(),
                },
            })
            .collect(),
    };

    ModInfo {
        mod_type: mod_type.into(),
        mod_list,
    }
}
