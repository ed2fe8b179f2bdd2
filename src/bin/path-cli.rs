use std::time::Duration;

use clap::{Parser, Subcommand};
use tcp_path_router::http::DEFAULT_TERMINATOR;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "path-cli")]
#[command(about = "Send requests to a running tcp-path-router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Seconds to wait for the server to close the connection
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a path with an HTTP/1.1 GET
    Get {
        path: String,
        #[arg(long, default_value = "localhost")]
        host: String,
    },
    /// Send text as-is (escapes like \r\n are expanded)
    Raw { text: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let request = match cli.command {
        Commands::Get { path, host } => {
            format!("GET {} HTTP/1.1\r\nHost: {}{}", path, host, DEFAULT_TERMINATOR)
        }
        Commands::Raw { text } => text.replace("\\r", "\r").replace("\\n", "\n"),
    };

    let mut stream = TcpStream::connect(&cli.addr).await?;
    stream.write_all(request.as_bytes()).await?;

    let mut response = Vec::new();
    let read = tokio::time::timeout(
        Duration::from_secs(cli.timeout),
        stream.read_to_end(&mut response),
    )
    .await;
    if read.is_err() {
        eprintln!("Server did not close the connection within {}s", cli.timeout);
    }

    if response.is_empty() {
        eprintln!("No response");
    } else {
        println!("{}", String::from_utf8_lossy(&response));
    }
    Ok(())
}
