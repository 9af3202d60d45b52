use mcstatus::{Conf, MspErr};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), MspErr> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let server = Conf::create_with_port("www.example.com", 25565);
    let status = server.get_server_status()?;

    println!("{}", status);
    println!("MOTD: {}", status.description_text());
    println!("Ping: {:?}", server.get_server_ping()?);

    Ok(())
}
