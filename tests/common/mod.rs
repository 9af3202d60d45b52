#![allow(dead_code)]

use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream, UdpSocket},
    sync::mpsc,
    thread::{self, JoinHandle},
    time::Duration,
};

pub const TIMEOUT: Duration = Duration::from_secs(2);

/// Accept one connection on a loopback port and hand it to `handler`.
pub fn tcp_server<F, T>(handler: F) -> (u16, JoinHandle<T>)
where
    F: FnOnce(TcpStream) -> T + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(TIMEOUT)).unwrap();
        handler(stream)
    });

    (port, handle)
}

/// Answer one query session: challenge token, then `stat_payload` after the
/// type/session header. Returns the stat request the client sent.
pub fn udp_server(token: &'static str, stat_payload: Vec<u8>) -> (u16, JoinHandle<Vec<u8>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = socket.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        socket.set_read_timeout(Some(TIMEOUT)).unwrap();

        let mut bufs = [0u8; 64];
        let (len, client) = socket.recv_from(&mut bufs).unwrap();
        assert_eq!(len, 7);
        assert_eq!(&bufs[..3], &[0xFE, 0xFD, 0x09]);

        let session = bufs[3..7].to_vec();
        let challenge = [[0x09u8].as_slice(), &session, token.as_bytes(), &[0x00]].concat();
        socket.send_to(&challenge, client).unwrap();

        let (len, client) = socket.recv_from(&mut bufs).unwrap();
        let request = bufs[..len].to_vec();
        assert_eq!(&request[3..7], session.as_slice());

        let response = [[0x00u8].as_slice(), &session, &stat_payload].concat();
        socket.send_to(&response, client).unwrap();

        request
    });

    (port, handle)
}

pub fn read_exact(stream: &mut TcpStream, size: usize) -> Vec<u8> {
    let mut bufs = vec![0u8; size];
    stream.read_exact(&mut bufs).unwrap();
    bufs
}

pub fn write(stream: &mut TcpStream, bufs: &[u8]) {
    stream.write_all(bufs).unwrap();
    stream.flush().unwrap();
}

/// Block until the peer closes and report whether it reset the connection.
pub fn peer_reset(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 16];

    loop {
        match stream.read(&mut buf) {
            Ok(0) => return false,
            Ok(_) => continue,
            Err(err) => return err.kind() == std::io::ErrorKind::ConnectionReset,
        }
    }
}

/// Channel used by handlers that need to wait for the client to finish.
pub fn signal() -> (mpsc::Sender<()>, mpsc::Receiver<()>) {
    mpsc::channel()
}
