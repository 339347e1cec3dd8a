//! Tune-and-stream demo.
//!
//! Connects to a receiver, tunes to 14.0 MHz, starts the I/Q stream and
//! prints a line per received frame.
//!
//! ```sh
//! cargo run --example tune -- 192.168.1.100:50000 0.0.0.0:60000
//! ```

use netsdr_client::{Session, TcpControlTransport, UdpDataTransport};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let control_addr = args.next().unwrap_or_else(|| "127.0.0.1:50000".into());
    let data_addr = args.next().unwrap_or_else(|| "0.0.0.0:60000".into());

    let control = TcpControlTransport::new(control_addr);
    let data = UdpDataTransport::new(data_addr);
    let (tx, mut rx) = mpsc::channel(64);

    let mut session = Session::new(control, data, tx);
    session.connect().await?;
    session.change_frequency(14_000_000, 0).await?;
    session.start_iq().await?;

    for _ in 0..16 {
        match rx.recv().await {
            Some(frame) => {
                let count = frame.samples()?.len();
                println!("frame seq={} samples={}", frame.sequence, count);
            }
            None => break,
        }
    }

    session.stop_iq().await?;
    session.disconnect().await?;
    Ok(())
}
