//! Client for the Minecraft Java Edition server discovery protocols.
//!
//! | Protocol | Transport | Entry point |
//! |---|---|---|
//! | Server List Ping (1.7+) | TCP | [status], [ping], [Conf::get_server_status] |
//! | Legacy status (1.4 to 1.6) | TCP | [status_legacy], [Conf::get_legacy_server_status] |
//! | Beta status (beta 1.8 to 1.3) | TCP | [status_beta], [Conf::get_beta_server_status] |
//! | Query | UDP | [basic_query], [full_query], [Conf::query], [Conf::query_full] |
//!
//! Every call opens one connection, performs one exchange and closes the
//! connection again, whatever the outcome. Nothing is retried.

mod conf;
mod error;
mod query;
mod server;
mod share;
mod varint;

pub use conf::{Conf, SocketConf};
pub use error::{MspErr, Protocol};
pub use query::{QueryBasic, QueryFull, QueryFullPlayers, QueryPlayers, QueryVersion};
pub use server::{
    BetaServer, ForgeChannel, ForgeData, ForgeMod, LegacyPlayers, LegacyServer, LegacyVersion,
    Player, Players, Server, Version,
};
pub use share::{ModInfo, ModPlugin};
pub use varint::{decode_varint, encode_varint};

use std::time::Duration;

fn conf_with(host: &str, port: u16, connect_timeout: Duration, io_timeout: Duration) -> Conf {
    Conf::create_with_port(host, port).with_timeouts(connect_timeout, io_timeout)
}

/// Modern status of `host:port`, including the ping/pong latency.
pub fn status(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Result<Server, MspErr> {
    conf_with(host, port, connect_timeout, io_timeout).get_server_status()
}

/// Ping/pong latency of `host:port`.
pub fn ping(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Result<Duration, MspErr> {
    conf_with(host, port, connect_timeout, io_timeout).get_server_ping()
}

pub fn status_legacy(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Result<LegacyServer, MspErr> {
    conf_with(host, port, connect_timeout, io_timeout).get_legacy_server_status()
}

pub fn status_beta(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Result<BetaServer, MspErr> {
    conf_with(host, port, connect_timeout, io_timeout).get_beta_server_status()
}

pub fn basic_query(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Result<QueryBasic, MspErr> {
    conf_with(host, port, connect_timeout, io_timeout).query()
}

pub fn full_query(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    io_timeout: Duration,
) -> Result<QueryFull, MspErr> {
    conf_with(host, port, connect_timeout, io_timeout).query_full()
}
