use std::{io::BufRead, sync::Arc, thread, time::Duration};

use anyhow::anyhow;
use clap::Parser;
use roulette_sockets::prelude::*;

/// Joins a roulette table, possibly from behind a NAT
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Local host to open the socket on, the port is picked by the system
    #[arg(long, env = "ROULETTE_LOCAL", default_value = "127.0.0.1:27016")]
    local: Address,

    /// The table to play at, also where the punch-through probe goes
    #[arg(long, env = "ROULETTE_SERVER", default_value = "127.0.0.1:27015")]
    server: Address,

    /// Fixed payload size of every datagram, must match the server
    #[arg(long, env = "ROULETTE_PACKAGE_SIZE", default_value_t = 512)]
    package_size: usize,
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();

    let socket = Arc::new(ReliableSocket::new(
        SocketConfig::default().with_package_size(args.package_size),
    ));
    socket.start(&args.local, Some(&args.server))?;
    let loops = socket.spawn_loops()?;

    let printer = {
        let socket = Arc::clone(&socket);
        thread::Builder::new()
            .name("printer".to_string())
            .spawn(move || print_messages(&socket))?
    };

    let console = run_console(&socket, &args.server);
    socket.terminate();

    printer
        .join()
        .map_err(|_| anyhow!("printer thread panicked"))?;
    loops.join()?;
    console
}

fn print_messages(socket: &ReliableSocket) {
    while !socket.is_terminated() {
        let Some(package) = socket.dequeue_timeout(Duration::from_millis(100)) else {
            continue;
        };

        let text = package.text();
        match displayed_text(&text) {
            Some(message) => println!("{message}"),
            None => log::debug!("Ignoring message from {}: {text:?}", package.source),
        }
    }
}

fn run_console(socket: &ReliableSocket, server: &Address) -> anyhow::Result<()> {
    for line in std::io::stdin().lock().lines() {
        if socket.is_terminated() {
            break;
        }

        match ClientCommand::parse(&line?) {
            Some(ClientCommand::Exit) => break,
            Some(ClientCommand::Forward(command)) => match socket.send(server, command.as_bytes()) {
                Ok(()) => {}
                Err(e @ SocketError::PayloadTooLarge { .. }) => println!("{e}"),
                Err(e) => return Err(e.into()),
            },
            None => println!("{CLIENT_HELP}"),
        }
    }

    Ok(())
}
