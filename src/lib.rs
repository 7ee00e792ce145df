pub mod acknowledgement;
pub mod address;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod game;
pub mod logging;
pub mod packet;
pub mod queue;
pub mod sequence;
pub mod socket;

pub mod prelude {
    pub use crate::{
        address::Address,
        config::{DebugHooks, SocketConfig},
        console::{displayed_text, ClientCommand, ServerCommand, CLIENT_HELP},
        error::SocketError,
        game::{clip, player::Player, Outgoing, RouletteTable},
        logging,
        queue::{InboundQueue, PackageSink, ReceivedPackage},
        socket::{
            datagram::{Datagram, UdpDatagram},
            stats::SocketStats,
            ReliableSocket, SocketLoops,
        },
    };
}
