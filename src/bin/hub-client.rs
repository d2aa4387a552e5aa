use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use tcp_hub::capability::{Compression, PlaintextCipher, ZlibCompression};
use tcp_hub::codec::frame::{data_frame, heartbeat};
use tcp_hub::codec::{frame_codec, TransformChain, TransformOrder, DEFAULT_MAX_FRAME_LENGTH};

#[derive(Parser)]
#[command(name = "hub-client")]
#[command(about = "Test client for a running tcp-hub", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:7400")]
    addr: String,

    /// Zlib level used to compress payloads. Omit to send uncompressed.
    #[arg(short, long)]
    level: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send each argument as one message, then disconnect
    Send { messages: Vec<String> },
    /// Stay connected, answering with heartbeats, until Ctrl+C
    Hold {
        #[arg(long, default_value_t = 5)]
        heartbeat_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let compression = match cli.level {
        Some(level) => {
            Some(Arc::new(ZlibCompression::new(level, DEFAULT_MAX_FRAME_LENGTH)?) as Arc<dyn Compression>)
        }
        None => None,
    };
    let chain = TransformChain::new(
        Arc::new(PlaintextCipher),
        compression,
        TransformOrder::CompressThenEncrypt,
    );

    let stream = TcpStream::connect(&cli.addr).await?;
    println!("Connected to {} from {}", cli.addr, stream.local_addr()?);
    let mut framed = Framed::new(stream, frame_codec(DEFAULT_MAX_FRAME_LENGTH));

    match cli.command {
        Commands::Send { messages } => {
            for message in messages {
                let body = chain.encode(message.as_bytes())?;
                framed.send(data_frame(&body)).await?;
                println!("Sent {} bytes", message.len());
            }
            SinkExt::<Bytes>::close(&mut framed).await?;
        }
        Commands::Hold { heartbeat_secs } => {
            let mut ticker = tokio::time::interval(Duration::from_secs(heartbeat_secs.max(1)));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    _ = ticker.tick() => framed.send(heartbeat()).await?,
                    frame = framed.next() => match frame {
                        Some(Ok(frame)) if frame.is_empty() => {}
                        Some(Ok(frame)) => println!("Received {} bytes", frame.len()),
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            println!("Hub closed the connection");
                            break;
                        }
                    },
                }
            }
        }
    }

    Ok(())
}
