use crate::{query, server, BetaServer, LegacyServer, MspErr, QueryBasic, QueryFull, Server};
use std::{
    net::{Ipv4Addr, SocketAddr, ToSocketAddrs},
    time::Duration,
};

const DEFAULT_JAVA_PORT: u16 = 25565;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Main struct used for configuring the connection.
///
/// By default, the port number for Java Edition is 25565.
#[derive(Debug, Clone)]
pub struct Conf {
    /// Server IP address or a domain name.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// See [SocketConf].
    pub socket_conf: SocketConf,
}

/// Additional socket configuration.
///
/// Two independent timeouts bound every call: `connect_timeout` covers
/// establishing the connection, `read_timeout`/`write_timeout` cover each
/// individual send and receive step afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConf {
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Deadline applied to each read operation.
    pub read_timeout: Duration,
    /// Deadline applied to each write operation.
    pub write_timeout: Duration,
    /// Specify the address for creating a UDP connection.
    /// The default value is [Ipv4Addr::UNSPECIFIED].
    pub rep_udp_ipv4: Ipv4Addr,
    /// Specify the port for creating a UDP connection.
    /// The default value is 0, letting the OS pick a free port.
    pub rep_udp_port: u16,
}

impl Default for SocketConf {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            rep_udp_ipv4: Ipv4Addr::UNSPECIFIED,
            rep_udp_port: 0,
        }
    }
}

impl ToSocketAddrs for Conf {
    type Iter = std::vec::IntoIter<SocketAddr>;

    fn to_socket_addrs(&self) -> std::io::Result<Self::Iter> {
        (&*self.host, self.port).to_socket_addrs()
    }
}

impl Conf {
    /// Create a connection configuration using the default port.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mcstatus::{Conf, SocketConf};
    /// #
    /// let conf = Conf::create("www.example.com");
    /// #
    /// # assert_eq!(conf.host, "www.example.com");
    /// # assert_eq!(conf.port, 25565);
    /// # assert_eq!(conf.socket_conf, SocketConf::default());
    /// ```
    pub fn create(host: &str) -> Self {
        Self::create_with_port(host, DEFAULT_JAVA_PORT)
    }

    /// Create a connection configuration using the specified port.
    ///
    /// # Example
    ///
    /// ```
    /// # use mcstatus::{Conf};
    /// #
    /// let conf = Conf::create_with_port("www.example.com", 25566);
    /// #
    /// # assert_eq!(conf.port, 25566);
    /// ```
    pub fn create_with_port(host: &str, port: u16) -> Self {
        Self {
            host: host.trim().into(),
            port,
            socket_conf: SocketConf::default(),
        }
    }

    /// Create a connection configuration by using a string.
    ///
    /// Attempting to split the given string into two parts,
    /// with the first part being the host of the server and
    /// the second part being the port of the server. If the port
    /// cannot be converted to [u16], it will throw a [MspErr] error.
    ///
    /// # Example
    ///
    /// ```
    /// # use mcstatus::{Conf, MspErr};
    /// #
    /// # fn main() -> Result<(), MspErr> {
    ///     let conf = Conf::create_from_str("www.example.com:25565")?;
    /// #
    /// #   assert_eq!(conf.host, "www.example.com");
    /// #   assert_eq!(conf.port, 25565);
    /// #
    /// #   let conf = Conf::create_from_str("25565");
    /// #   assert!(conf.is_err());
    /// #   let conf = Conf::create_from_str("www.example.com:-1");
    /// #   assert!(conf.is_err());
    /// #   Ok(())
    /// # }
    /// ```
    pub fn create_from_str(addr: &str) -> Result<Self, MspErr> {
        let addr_split = addr.split(':').map(|x| x.trim()).collect::<Vec<_>>();

        if addr_split.len() != 2 {
            return Err(MspErr::DataErr(format!(
                "Invalid IPv4 socket address syntax: {}",
                addr
            )));
        }

        match addr_split[1].parse::<u16>() {
            Ok(port) => Ok(Self::create_with_port(addr_split[0], port)),
            Err(_) => Err(MspErr::DataErr(format!("Invalid port: {}", addr_split[1]))),
        }
    }

    /// Set the connection timeout and use `io_timeout` for both reads and writes.
    ///
    /// ```
    /// # use mcstatus::Conf;
    /// # use std::time::Duration;
    /// let conf = Conf::create("localhost")
    ///     .with_timeouts(Duration::from_secs(2), Duration::from_millis(500));
    ///
    /// assert_eq!(conf.socket_conf.connect_timeout, Duration::from_secs(2));
    /// assert_eq!(conf.socket_conf.read_timeout, Duration::from_millis(500));
    /// assert_eq!(conf.socket_conf.write_timeout, Duration::from_millis(500));
    /// ```
    pub fn with_timeouts(mut self, connect_timeout: Duration, io_timeout: Duration) -> Self {
        self.socket_conf.connect_timeout = connect_timeout;
        self.socket_conf.read_timeout = io_timeout;
        self.socket_conf.write_timeout = io_timeout;
        self
    }

    /// Get info from a modern Java Edition server.
    ///
    /// Using the [Server List Ping](https://wiki.vg/Server_List_Ping#Current_.281.7.2B.29) protocol.
    /// Suitable for Java Edition servers version 1.7 and above. Return type is [Server].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mcstatus::{Conf, MspErr};
    ///
    /// fn main() -> Result<(), MspErr> {
    ///     let server = Conf::create("www.example.com");
    ///     let info = server.get_server_status()?;
    ///
    ///     println!("{}", info);
    ///     Ok(())
    /// }
    /// ```
    pub fn get_server_status(&self) -> Result<Server, MspErr> {
        server::get_server_status(self)
    }

    /// Measure the ping/pong round trip of a modern Java Edition server.
    ///
    /// Fails whenever [Conf::get_server_status] would fail.
    pub fn get_server_ping(&self) -> Result<Duration, MspErr> {
        server::get_server_ping(self)
    }

    /// Get info from a legacy Java Edition server.
    ///
    /// Sends the `0xFE 0x01 0xFA` request understood by servers before the
    /// Netty rewrite. Return type is [LegacyServer].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mcstatus::{Conf, MspErr};
    ///
    /// fn main() -> Result<(), MspErr> {
    ///     let server = Conf::create("www.example.com");
    ///     let info = server.get_legacy_server_status()?;
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn get_legacy_server_status(&self) -> Result<LegacyServer, MspErr> {
        server::get_legacy_server_status(self)
    }

    /// Get the raw status payload of a Java Edition server in beta release.
    ///
    /// Suitable for Java Edition servers version beta 1.8 to 1.3.
    /// Return type is [BetaServer].
    pub fn get_beta_server_status(&self) -> Result<BetaServer, MspErr> {
        server::get_beta_server_status(self)
    }

    /// Get **basic** info from a modern Java Edition server using the [Query](https://wiki.vg/Query) protocol.
    ///
    /// To use this protocol, you need to enable the enable-query option on the server side.
    /// See [Server Config](https://wiki.vg/Query#Server_Config). Return type is [QueryBasic].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use mcstatus::{Conf, MspErr};
    ///
    /// fn main() -> Result<(), MspErr> {
    ///     let server = Conf::create_with_port("www.example.com", 25565);
    ///     let info = server.query()?;
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn query(&self) -> Result<QueryBasic, MspErr> {
        query::query_basic_status(self)
    }

    /// Get **full** info from a modern Java Edition server using the [Query](https://wiki.vg/Query) protocol.
    ///
    /// Return type is [QueryFull].
    pub fn query_full(&self) -> Result<QueryFull, MspErr> {
        query::query_full_status(self)
    }
}
