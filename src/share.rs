use crate::{conf::Conf, MspErr, SocketConf};
use serde::Serialize;
use socket2::SockRef;
use std::{
    io::{Read, Write},
    net::{IpAddr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket},
    time::{Duration, Instant},
};

/// Server mod (e.g. `CraftBukkit`, `FML`) and its ordered plugin/mod list.
///
/// Both axes are always present: a vanilla server has an empty `mod_type`
/// and an empty `mod_list`.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ModInfo {
    pub mod_type: String,
    pub mod_list: Vec<ModPlugin>,
}

/// One entry of a [ModInfo] list. `version` is empty when the server did not send one.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ModPlugin {
    pub name: String,
    pub version: String,
}

/// A TCP connection that is reset instead of gracefully shut down when dropped.
///
/// Every read and write is bounded by the I/O timeouts of the [SocketConf]
/// it was opened with. A single `read_exact` counts as one operation: the
/// deadline is fixed when it starts and is not extended by partial reads.
pub struct TcpConn {
    stream: TcpStream,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl TcpConn {
    pub fn peer_ip(&self) -> Result<IpAddr, MspErr> {
        Ok(self.stream.peer_addr()?.ip())
    }

    pub fn write_all(&mut self, bufs: &[u8]) -> Result<(), MspErr> {
        self.stream
            .set_write_timeout(Some(non_zero(self.write_timeout)))?;
        self.stream.write_all(bufs)?;
        self.stream.flush()?;
        tracing::trace!(len = bufs.len(), "tcp write");

        Ok(())
    }

    /// Borrow the stream as a reader sharing one deadline across all reads.
    pub fn reader(&mut self) -> DeadlineReader<'_> {
        DeadlineReader {
            deadline: Instant::now() + self.read_timeout,
            stream: &mut self.stream,
        }
    }

    pub fn read_exact(&mut self, size: usize) -> Result<Vec<u8>, MspErr> {
        let mut bufs = vec![0u8; size];

        self.reader().read_exact(&mut bufs)?;
        tracing::trace!(len = size, "tcp read exact");

        Ok(bufs)
    }

    /// Single read of whatever the server has sent, up to `max` bytes.
    pub fn read_available(&mut self, max: usize) -> Result<Vec<u8>, MspErr> {
        let mut bufs = vec![0u8; max];
        let len = self.reader().read(&mut bufs)?;

        bufs.truncate(len);
        tracing::trace!(len, "tcp read available");

        Ok(bufs)
    }
}

impl Drop for TcpConn {
    fn drop(&mut self) {
        // SO_LINGER with a zero timeout turns close() into an RST.
        if let Err(err) = SockRef::from(&self.stream).set_linger(Some(Duration::ZERO)) {
            tracing::debug!(%err, "failed to set linger before reset");
        }
    }
}

pub struct DeadlineReader<'a> {
    stream: &'a mut TcpStream,
    deadline: Instant,
}

impl Read for DeadlineReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());

        if remaining.is_zero() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "read deadline exceeded",
            ));
        }

        self.stream.set_read_timeout(Some(remaining))?;
        self.stream.read(buf)
    }
}

/// `set_read_timeout(Some(ZERO))` is rejected by std, round it up.
fn non_zero(timeout: Duration) -> Duration {
    timeout.max(Duration::from_millis(1))
}

fn resolve(conf: &Conf) -> Result<Vec<SocketAddr>, MspErr> {
    let addrs = conf.to_socket_addrs()?.collect::<Vec<_>>();

    if addrs.is_empty() {
        return Err(MspErr::IoErr(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{}:{} did not resolve to any address", conf.host, conf.port),
        )));
    }

    Ok(addrs)
}

pub fn create_tcp_socket(conf: &Conf) -> Result<TcpConn, MspErr> {
    let socket_conf = &conf.socket_conf;
    let mut last_err = None;

    for addr in resolve(conf)? {
        match TcpStream::connect_timeout(&addr, non_zero(socket_conf.connect_timeout)) {
            Ok(stream) => {
                tracing::debug!(%addr, "tcp connected");

                return Ok(TcpConn {
                    stream,
                    read_timeout: socket_conf.read_timeout,
                    write_timeout: socket_conf.write_timeout,
                });
            }
            Err(err) => {
                tracing::debug!(%addr, %err, "tcp connect failed");
                last_err = Some(err);
            }
        }
    }

    Err(match last_err {
        Some(err) => MspErr::IoErr(err),
        None => MspErr::InternalErr("no address attempted".into()),
    })
}

/// Bind a local UDP socket and connect it to the first resolved server address.
pub fn create_udp_socket(conf: &Conf) -> Result<UdpSocket, MspErr> {
    let socket_conf: &SocketConf = &conf.socket_conf;
    let target = resolve(conf)?[0];
    let local_ip: IpAddr = match target {
        SocketAddr::V4(_) => socket_conf.rep_udp_ipv4.into(),
        SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
    };
    let socket = UdpSocket::bind((local_ip, socket_conf.rep_udp_port))?;

    socket.connect(target)?;
    socket.set_read_timeout(Some(non_zero(socket_conf.read_timeout)))?;
    socket.set_write_timeout(Some(non_zero(socket_conf.write_timeout)))?;
    tracing::debug!(%target, local = ?socket.local_addr().ok(), "udp connected");

    Ok(socket)
}

pub fn bufs_to_utf16_str(bufs: &[u8]) -> Result<String, MspErr> {
    if bufs.len() % 2 != 0 {
        return Err(MspErr::DataErr(format!(
            "Conversion from UTF-16 to string failed. Expected length to be even, but got: {}",
            bufs.len()
        )));
    }

    Ok(String::from_utf16_lossy(
        bufs.chunks(2)
            .map(|x| u16::from_be_bytes([x[0], x[1]]))
            .collect::<Vec<_>>()
            .as_slice(),
    ))
}

/// Split on single null bytes. Every terminated value is kept, including
/// empty ones; trailing bytes without a terminator are dropped.
pub fn split_nt_str(bufs: &[u8]) -> Vec<String> {
    let mut result = Vec::new();
    let mut value = Vec::new();

    for &buf in bufs {
        match buf {
            0x00 => {
                result.push(String::from_utf8_lossy(&value).into_owned());
                value.clear();
            }
            common_buf => value.push(common_buf),
        }
    }

    result
}

/// Split on paired null bytes.
///
/// A value ends only when two consecutive `0x00` are seen; a lone `0x00` is
/// skipped. The final value is appended even though it is not terminated.
pub fn split_double_nt_str(bufs: &[u8]) -> Vec<String> {
    let mut result = Vec::new();
    let mut value = Vec::new();
    let mut pending_null = false;

    for &buf in bufs {
        match buf {
            0x00 if pending_null => {
                result.push(String::from_utf8_lossy(&value).into_owned());
                value.clear();
                pending_null = false;
            }
            0x00 => pending_null = true,
            common_buf => {
                value.push(common_buf);
                pending_null = false;
            }
        }
    }

    result.push(String::from_utf8_lossy(&value).into_owned());

    result
}

/// Decode alternating null-terminated key/value strings, preserving order.
///
/// A key without a terminated value is dropped.
pub fn split_nt_kv(bufs: &[u8]) -> Vec<(String, String)> {
    let mut result = Vec::new();
    let mut key: Option<String> = None;
    let mut value = Vec::new();

    for &buf in bufs {
        match buf {
            0x00 => {
                let text = String::from_utf8_lossy(&value).into_owned();
                value.clear();

                match key.take() {
                    None => key = Some(text),
                    Some(k) => result.push((k, text)),
                }
            }
            common_buf => value.push(common_buf),
        }
    }

    result
}

/// Split `bufs` on every occurrence of `token`, always yielding
/// `occurrences + 1` parts.
pub fn split_on_token<'a>(bufs: &'a [u8], token: &[u8]) -> Vec<&'a [u8]> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut idx = 0;

    if token.is_empty() {
        return vec![bufs];
    }

    while idx + token.len() <= bufs.len() {
        if &bufs[idx..idx + token.len()] == token {
            parts.push(&bufs[start..idx]);
            idx += token.len();
            start = idx;
        } else {
            idx += 1;
        }
    }

    parts.push(&bufs[start..]);

    parts
}

/// Parse a decimal count field, naming the field in the error.
pub fn parse_int(field: &str, value: &str) -> Result<i32, MspErr> {
    value.parse::<i32>().map_err(|err| {
        MspErr::DataErr(format!(
            "Can not parse {} `{}` into number, reason: {}",
            field, value, err
        ))
    })
}
