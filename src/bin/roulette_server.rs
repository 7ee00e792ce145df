use std::{
    io::BufRead,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use anyhow::anyhow;
use clap::Parser;
use roulette_sockets::prelude::*;

/// Runs the roulette table players connect to
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address the table listens on
    #[arg(long, env = "ROULETTE_BIND", default_value = "127.0.0.1:27015")]
    bind: Address,

    /// Fixed payload size of every datagram, must match the clients
    #[arg(long, env = "ROULETTE_PACKAGE_SIZE", default_value_t = 512)]
    package_size: usize,
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();

    let socket = Arc::new(ReliableSocket::new(
        SocketConfig::default().with_package_size(args.package_size),
    ));
    socket.start(&args.bind, None)?;
    let loops = socket.spawn_loops()?;

    let table = Arc::new(Mutex::new(RouletteTable::new()));
    let logic = {
        let socket = Arc::clone(&socket);
        let table = Arc::clone(&table);
        thread::Builder::new()
            .name("table".to_string())
            .spawn(move || run_table(&socket, &table))?
    };

    let console = run_console(&table);
    socket.terminate();

    logic
        .join()
        .map_err(|_| anyhow!("table thread panicked"))??;
    loops.join()?;
    console
}

/// Feeds every accepted package to the table and sends out its replies
fn run_table(socket: &ReliableSocket, table: &Mutex<RouletteTable>) -> anyhow::Result<()> {
    let max = socket.config().package_size;

    while !socket.is_terminated() {
        let Some(package) = socket.dequeue_timeout(Duration::from_millis(100)) else {
            continue;
        };

        let replies = table
            .lock()
            .map_err(|_| anyhow!("table lock poisoned"))?
            .handle(&package.source, &package.text());

        for outgoing in replies {
            match socket.send(&outgoing.to, clip(&outgoing.text, max).as_bytes()) {
                Ok(()) => {}
                Err(SocketError::IllegalState { .. }) => return Ok(()),
                Err(e) => log::warn!("Could not reply to {}: {e}", outgoing.to),
            }
        }
    }

    Ok(())
}

fn run_console(table: &Mutex<RouletteTable>) -> anyhow::Result<()> {
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let Some(command) = ServerCommand::parse(&line) else {
            println!("Unknown command. List of commands:\nexit\nlist\nplayers\nban <name>");
            continue;
        };

        let mut table = table.lock().map_err(|_| anyhow!("table lock poisoned"))?;
        match command {
            ServerCommand::Exit => break,
            ServerCommand::List => {
                for address in table.addresses() {
                    println!("Connection on {address}");
                }
            }
            ServerCommand::Players => {
                for player in table.players() {
                    println!("Player {} connected on {}", player.name, player.address);
                }
            }
            ServerCommand::Ban(name) => {
                let outcome = if table.ban(&name) { "banned" } else { "not found" };
                println!("Player {name} {outcome}");
            }
        }
    }

    Ok(())
}
