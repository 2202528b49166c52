use std::io::Write;

use clap::Parser;
use kache::client::{split_args, Client, ClientError};
use kache::config::DEFAULT_PORT;
use kache::Error;
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "kache-cli", version, about = "Interactive client for the kache server")]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    let mut client = match Client::connect((args.host.as_str(), args.port)).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!(
                "Connection to kache server on {}:{} failed: {}",
                args.host, args.port, e
            );
            std::process::exit(1);
        }
    };
    println!("Connected to kache server. Type 'exit' or 'quit' to close.");

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        print!("kache> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }

        let tokens = match split_args(line) {
            Some(tokens) if tokens.is_empty() => continue,
            Some(tokens) => tokens,
            None => {
                println!("Invalid argument(s): unbalanced quotes");
                continue;
            }
        };

        match client.request(&tokens).await {
            Ok(reply) => println!("{}", reply),
            Err(ClientError::Disconnected) => {
                println!("Server disconnected.");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
