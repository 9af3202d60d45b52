use mcstatus::{Conf, MspErr, SocketConf};
use std::time::Duration;

fn main() -> Result<(), MspErr> {
    let conf = Conf::create("www.example.com");

    assert_eq!(conf.host, "www.example.com");
    assert_eq!(conf.port, 25565);
    assert_eq!(conf.socket_conf, SocketConf::default());

    let conf = Conf::create_with_port("www.example.com", 25566)
        .with_timeouts(Duration::from_secs(1), Duration::from_millis(250));
    assert_eq!(conf.port, 25566);
    assert_eq!(conf.socket_conf.read_timeout, Duration::from_millis(250));

    let conf = Conf::create_from_str("192.168.1.10:25565")?;

    assert_eq!(conf.host, "192.168.1.10");
    assert_eq!(conf.port, 25565);

    let conf = Conf::create_from_str("www.example.com:25565")?;

    assert_eq!(conf.host, "www.example.com");
    assert_eq!(conf.port, 25565);
    Ok(())
}
