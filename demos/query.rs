use mcstatus::MspErr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), MspErr> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let connect_timeout = Duration::from_secs(3);
    let io_timeout = Duration::from_secs(2);

    println!(
        "{}",
        mcstatus::basic_query("www.example.com", 25565, connect_timeout, io_timeout)?
    );
    println!(
        "{}",
        mcstatus::full_query("www.example.com", 25565, connect_timeout, io_timeout)?
    );

    Ok(())
}
