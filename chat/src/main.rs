//! ## CHAT CLIENT
//!
//! Interactive binary entry point: authenticates against the directory,
//! binds a peer listener, then drives a line-oriented stdin/stdout REPL
//! in place of the curses screen the reference client used.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use eurechat_client::{ClientCore, PeerEventSink};

/// Peer-to-peer chat client for the eurechat network.
#[derive(Parser)]
#[command(name = "chat", version, about)]
struct Args {
    /// Username to register with the directory.
    username: String,

    /// Password to authenticate with. The reference directory accepts
    /// any value.
    password: String,

    /// Directory address, as `host:port`.
    #[arg(long, default_value = "127.0.0.1:8888")]
    directory: String,
}

/// Prints inbound peer messages to stdout as they arrive. Peer traffic
/// runs on its own thread, so a line may interleave with the prompt;
/// the reference client has the same property.
struct StdoutSink;

impl PeerEventSink for StdoutSink {
    fn on_message(&self, sender: &str, payload: &[u8]) {
        let text = String::from_utf8_lossy(payload);
        println!("\n[{sender}] {text}");
        print!("> ");
        let _ = io::stdout().flush();
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut client = match ClientCore::connect(&args.directory, &args.username, &args.password) {
        Ok(client) => client,
        Err(error) => {
            eprintln!("Connect Error: {error}");
            std::process::exit(1);
        }
    };

    if let Err(error) = client.bind(Arc::new(StdoutSink)) {
        eprintln!("Bind Error: {error}");
        std::process::exit(1);
    }

    println!("Connected as {}. Type 'help' for commands.", client.username());
    run_repl(&mut client);
}

fn run_repl(client: &mut ClientCore) {
    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                eprintln!("Read Error: {error}");
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, ' ');
        let command = parts.next().unwrap_or_default();

        match command {
            "help" => print_help(),
            "bye" => break,
            "list" => {
                let filter = parts.next();
                match client.list(filter) {
                    Ok(users) => println!("Online: {}", users.join(", ")),
                    Err(error) => println!("List Error: {error}"),
                }
            }
            "chat" => {
                let target = parts.next().unwrap_or_default();
                let text = parts.next().unwrap_or_default();
                if target.is_empty() || text.is_empty() {
                    println!("usage: chat <user> <text>");
                    continue;
                }
                if let Err(error) = client.chat(target, text) {
                    println!("Chat Error: {error}");
                }
            }
            "ping" => {
                let target = parts.next().unwrap_or_default();
                if target.is_empty() {
                    println!("usage: ping <user>");
                    continue;
                }
                match client.ping(target) {
                    Ok((msg_type, arg)) => {
                        println!("{msg_type} from {}", arg.unwrap_or_default());
                    }
                    Err(error) => println!("Ping Error: {error}"),
                }
            }
            "secret" => {
                let target = parts.next().unwrap_or_default();
                let text = parts.next().unwrap_or_default();
                if target.is_empty() || text.is_empty() {
                    println!("usage: secret <user> <text>");
                    continue;
                }
                match client.secret(target, text) {
                    Ok(replies) => {
                        for reply in replies {
                            println!("  {} {}", reply.msg_type, String::from_utf8_lossy(&reply.payload));
                        }
                    }
                    Err(error) => println!("Secret Error: {error}"),
                }
            }
            other => println!("unknown command '{other}' (try 'help')"),
        }
    }

    if let Err(error) = client.leave() {
        eprintln!("Leave Error: {error}");
    }
}

fn print_help() {
    println!("commands:");
    println!("  chat <user> <text>    send a direct message");
    println!("  list [<user>]         list online users, optionally filtered");
    println!("  ping <user>           ping a user's peer listener");
    println!("  secret <user> <text>  send a message and collect up to 3 replies");
    println!("  help                  show this message");
    println!("  bye                   leave the directory and exit");
}
