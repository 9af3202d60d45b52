use mcstatus::{Conf, MspErr};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), MspErr> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let server = Conf::create_with_port("www.example.com", 25565);

    println!("{}", server.get_legacy_server_status()?);

    Ok(())
}
