/// Which protocol family produced a [MspErr::MissingInformation] or
/// [MspErr::ResponseTooShort].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Modern Server List Ping.
    Status,
    /// Pre-1.7 status (`0xFE 0x01 0xFA`).
    StatusLegacy,
    /// UDP Query, basic or full.
    Query,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Protocol::Status => "status",
            Protocol::StatusLegacy => "status legacy",
            Protocol::Query => "query",
        };

        write!(f, "{}", name)
    }
}

/// Msp error uniform error definition.
///
/// Every variant aborts the current call. No partial result is ever returned
/// and the connection is always closed before the error reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum MspErr {
    /// Handling errors that occur during sockets, including deadline expiry.
    #[error("{0}")]
    IoErr(#[from] std::io::Error),
    /// The response is too small to contain valid data.
    #[error("invalid {0} response: response is too small")]
    ResponseTooShort(Protocol),
    /// The JSON length prefix does not match the received JSON length.
    #[error("invalid status response: JSON size information is invalid")]
    InvalidSizeInfo,
    /// A VarInt sent by the server runs past 5 bytes.
    #[error("invalid status response: varint sent by server exceeds size limit")]
    VarIntTooLarge,
    /// The pong does not echo the ping packet.
    #[error("invalid status response: pong sent by server does not match ping packet")]
    InvalidPong,
    #[error("invalid query response: challenge token is too small")]
    ChallengeTokenTooShort,
    #[error("invalid query response: challenge token doesn't contain a null-terminator")]
    ChallengeTokenMissingTerminator,
    /// The `\0\x01player_\0\0` marker is absent or appears more than once.
    #[error("invalid query response: player token not in response")]
    PlayerTokenMissing,
    /// The response parsed cleanly but a mandatory field is absent.
    #[error("invalid {protocol} response: {field} missing from response")]
    MissingInformation { protocol: Protocol, field: String },
    /// Unintended errors occur when processing data.
    #[error("{0}")]
    DataErr(String),
    /// Internal errors sent, including type conversion, string analysis, etc.
    #[error("{0}")]
    InternalErr(String),
}

impl MspErr {
    pub(crate) fn missing(protocol: Protocol, field: &str) -> Self {
        MspErr::MissingInformation {
            protocol,
            field: field.into(),
        }
    }
}

impl From<serde_json::Error> for MspErr {
    fn from(err: serde_json::Error) -> Self {
        MspErr::DataErr(err.to_string())
    }
}
