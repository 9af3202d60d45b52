use mcstatus::{Conf, MspErr};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), MspErr> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let server = Conf::create_with_port("www.example.com", 25565);
    let status = server.get_beta_server_status()?;

    println!("{} bytes in {:?}", status.payload.len(), status.latency);
    println!("{}", status.payload_text()?);

    Ok(())
}
