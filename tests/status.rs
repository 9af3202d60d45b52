mod common;

use common::{peer_reset, read_exact, tcp_server, write, TIMEOUT};
use mcstatus::{encode_varint, MspErr, Protocol};
use std::{net::TcpStream, time::Duration};

const PING: [u8; 10] = [0x09, 0x01, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07];

const STATUS_JSON: &str = r#"{
    "version": {"name": "1.8.9", "protocol": 47},
    "players": {"max": 20, "online": 2, "sample": [{"name": "Notch", "id": "069a79f4-44e9-4726-a5be-fca90e38aaf5"}]},
    "description": {"text": "A Minecraft Server"},
    "favicon": "data:image/png;base64,iVBORw0KGgo="
}"#;

/// Read the handshake and the status request, checking their framing.
fn read_status_request(stream: &mut TcpStream, port: u16) {
    let len = read_exact(stream, 1)[0] as usize;
    let handshake = read_exact(stream, len);

    assert_eq!(handshake[0], 0x00);
    assert_eq!(handshake[1], 47);
    assert_eq!(handshake[2] as usize, "127.0.0.1".len());
    assert_eq!(&handshake[3..12], b"127.0.0.1");
    assert_eq!(&handshake[12..14], &port.to_be_bytes());
    assert_eq!(handshake[14], 1);
    assert_eq!(read_exact(stream, 2), vec![0x01, 0x00]);
}

fn status_frame(json: &str) -> Vec<u8> {
    let payload = [vec![0x00], encode_varint(json.len() as u64), json.as_bytes().to_vec()].concat();

    [encode_varint(payload.len() as u64), payload].concat()
}

/// Fake modern server. `pong` overrides the echoed ping.
fn modern_server(json: &'static str, pong: Option<[u8; 10]>) -> (u16, std::thread::JoinHandle<bool>) {
    tcp_server(move |mut stream| {
        let port = stream.local_addr().unwrap().port();

        read_status_request(&mut stream, port);
        write(&mut stream, &status_frame(json));
        assert_eq!(read_exact(&mut stream, 10), PING.to_vec());
        write(&mut stream, &pong.unwrap_or(PING));

        peer_reset(&mut stream)
    })
}

#[test]
fn status_returns_typed_result() {
    let (port, handle) = modern_server(STATUS_JSON, None);
    let server = mcstatus::status("127.0.0.1", port, TIMEOUT, TIMEOUT).unwrap();

    assert_eq!(server.ip.to_string(), "127.0.0.1");
    assert_eq!(server.port, port);
    assert_eq!(server.players.max, 20);
    assert_eq!(server.players.online, 2);
    assert_eq!(server.players.sample[0].name, "Notch");
    assert_eq!(server.version.name, "1.8.9");
    assert_eq!(server.version.protocol, 47);
    assert_eq!(server.favicon, "data:image/png;base64,iVBORw0KGgo=");
    assert_eq!(server.description, "{\n  \"text\": \"A Minecraft Server\"\n}");
    assert!(server.latency < TIMEOUT);

    // The client resets instead of closing gracefully.
    assert!(handle.join().unwrap());
}

#[test]
fn ping_returns_latency() {
    let (port, handle) = modern_server(STATUS_JSON, None);
    let latency = mcstatus::ping("127.0.0.1", port, TIMEOUT, TIMEOUT).unwrap();

    assert!(latency < TIMEOUT);
    handle.join().unwrap();
}

#[test]
fn ping_reports_missing_information() {
    let (port, handle) = modern_server(r#"{"description":"x"}"#, None);

    match mcstatus::ping("127.0.0.1", port, TIMEOUT, TIMEOUT) {
        Err(MspErr::MissingInformation { protocol, field }) => {
            assert_eq!(protocol, Protocol::Status);
            assert_eq!(field, "max players");
        }
        other => panic!("unexpected {:?}", other),
    }
    handle.join().unwrap();
}

#[test]
fn ping_reports_declared_json_length_mismatch() {
    let (port, handle) = tcp_server(|mut stream| {
        let port = stream.local_addr().unwrap().port();
        let payload = [
            vec![0x00],
            encode_varint(STATUS_JSON.len() as u64 + 40),
            STATUS_JSON.as_bytes().to_vec(),
        ]
        .concat();

        read_status_request(&mut stream, port);
        write(&mut stream, &[encode_varint(payload.len() as u64), payload].concat());
        assert_eq!(read_exact(&mut stream, 10), PING.to_vec());
        write(&mut stream, &PING);
        peer_reset(&mut stream);
    });

    assert!(matches!(
        mcstatus::ping("127.0.0.1", port, TIMEOUT, TIMEOUT),
        Err(MspErr::InvalidSizeInfo)
    ));
    handle.join().unwrap();
}

#[test]
fn mismatched_pong_is_invalid_pong() {
    let mut pong = PING;
    pong[9] = 0x08;

    let (port, handle) = modern_server(STATUS_JSON, Some(pong));

    assert!(matches!(
        mcstatus::status("127.0.0.1", port, TIMEOUT, TIMEOUT),
        Err(MspErr::InvalidPong)
    ));
    handle.join().unwrap();

    let (port, handle) = modern_server(STATUS_JSON, Some(pong));

    assert!(matches!(
        mcstatus::ping("127.0.0.1", port, TIMEOUT, TIMEOUT),
        Err(MspErr::InvalidPong)
    ));
    handle.join().unwrap();
}

#[test]
fn missing_online_players_is_reported() {
    let (port, handle) = modern_server(
        r#"{"version":{"name":"1.8.9","protocol":47},"players":{"max":20},"description":"x"}"#,
        None,
    );

    match mcstatus::status("127.0.0.1", port, TIMEOUT, TIMEOUT) {
        Err(MspErr::MissingInformation { protocol, field }) => {
            assert_eq!(protocol, Protocol::Status);
            assert_eq!(field, "online players");
        }
        other => panic!("unexpected {:?}", other),
    }
    handle.join().unwrap();
}

#[test]
fn declared_json_length_mismatch_is_invalid_size_info() {
    let (port, handle) = tcp_server(|mut stream| {
        let port = stream.local_addr().unwrap().port();
        let json = br#"{"description":"x"}"#;
        let payload = [[0x00u8].as_slice(), &encode_varint(json.len() as u64 - 2), json].concat();

        read_status_request(&mut stream, port);
        write(&mut stream, &[encode_varint(payload.len() as u64), payload].concat());
        read_exact(&mut stream, 10);
        write(&mut stream, &PING);
        peer_reset(&mut stream);
    });

    assert!(matches!(
        mcstatus::status("127.0.0.1", port, TIMEOUT, TIMEOUT),
        Err(MspErr::InvalidSizeInfo)
    ));
    handle.join().unwrap();
}

#[test]
fn oversized_length_prefix_is_varint_too_large() {
    let (port, handle) = tcp_server(|mut stream| {
        let port = stream.local_addr().unwrap().port();

        read_status_request(&mut stream, port);
        write(&mut stream, &[0x80; 8]);
        peer_reset(&mut stream);
    });

    assert!(matches!(
        mcstatus::status("127.0.0.1", port, TIMEOUT, TIMEOUT),
        Err(MspErr::VarIntTooLarge)
    ));
    handle.join().unwrap();
}

#[test]
fn stalled_server_hits_io_timeout() {
    let (tx, rx) = common::signal();
    let (port, handle) = tcp_server(move |mut stream| {
        let port = stream.local_addr().unwrap().port();

        read_status_request(&mut stream, port);
        // Send half of the response and stall.
        write(&mut stream, &[0x40, 0x00]);
        rx.recv_timeout(TIMEOUT).ok();
    });

    let result = mcstatus::status("127.0.0.1", port, TIMEOUT, Duration::from_millis(200));

    assert!(matches!(result, Err(MspErr::IoErr(_))), "{:?}", result);
    tx.send(()).ok();
    handle.join().unwrap();
}

#[test]
fn refused_connection_is_io_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    assert!(matches!(
        mcstatus::status("127.0.0.1", port, TIMEOUT, TIMEOUT),
        Err(MspErr::IoErr(_))
    ));
}

#[test]
fn legacy_status_parses_double_null_fields() {
    let (port, handle) = tcp_server(|mut stream| {
        assert_eq!(read_exact(&mut stream, 3), vec![0xFE, 0x01, 0xFA]);

        let body = "47\01.4.2\0A Minecraft Server\03\020"
            .encode_utf16()
            .flat_map(|c| c.to_be_bytes())
            .collect::<Vec<_>>();
        let header = [0xFF, 0x00, 0x23, 0x00, 0xA7, 0x00, 0x31, 0x00, 0x00];

        write(&mut stream, &[header.as_slice(), &body].concat());
        peer_reset(&mut stream)
    });

    let server = mcstatus::status_legacy("127.0.0.1", port, TIMEOUT, TIMEOUT).unwrap();

    assert_eq!(server.version.protocol, 47);
    assert_eq!(server.version.name, "1.4.2");
    assert_eq!(server.description, "A Minecraft Server");
    assert_eq!(server.players.online, 3);
    assert_eq!(server.players.max, 20);
    assert!(handle.join().unwrap());
}

#[test]
fn legacy_status_with_three_fields_is_missing_information() {
    let (port, handle) = tcp_server(|mut stream| {
        read_exact(&mut stream, 3);

        let mut bufs = vec![0xFF, 0x00, 0x23, 0x00, 0xA7, 0x00, 0x31, 0x00, 0x00];
        bufs.extend_from_slice(b"1\0\x001.8\0\0A Minecraft Server");

        write(&mut stream, &bufs);
        peer_reset(&mut stream);
    });

    assert!(matches!(
        mcstatus::status_legacy("127.0.0.1", port, TIMEOUT, TIMEOUT),
        Err(MspErr::MissingInformation {
            protocol: Protocol::StatusLegacy,
            ..
        })
    ));
    handle.join().unwrap();
}

#[test]
fn beta_status_reads_doubled_length() {
    let text = "A Minecraft Server§0§20";
    let (port, handle) = tcp_server(move |mut stream| {
        assert_eq!(read_exact(&mut stream, 1), vec![0xFE]);

        let units = text.encode_utf16().collect::<Vec<_>>();
        let mut bufs = vec![0xFF];
        bufs.extend_from_slice(&(units.len() as u16).to_be_bytes());
        units.iter().for_each(|u| bufs.extend_from_slice(&u.to_be_bytes()));

        // Split the payload to exercise the cumulative read.
        let (head, tail) = bufs.split_at(10);
        write(&mut stream, head);
        std::thread::sleep(Duration::from_millis(50));
        write(&mut stream, tail);
        peer_reset(&mut stream)
    });

    let server = mcstatus::status_beta("127.0.0.1", port, TIMEOUT, TIMEOUT).unwrap();

    assert_eq!(server.payload.len(), text.encode_utf16().count() * 2);
    assert_eq!(server.payload_text().unwrap(), text);
    assert!(handle.join().unwrap());
}
