use std::fmt;

use super::bets::Bet;
use crate::address::Address;

/// Money every player sits down with
pub const DEFAULT_MONEY: u32 = 1000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerRole {
    Unassigned,
    Player,
    Admin,
    Banned,
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlayerRole::Unassigned => "unassigned",
            PlayerRole::Player => "player",
            PlayerRole::Admin => "admin",
            PlayerRole::Banned => "banned",
        })
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub address: Address,
    pub name: String,
    pub role: PlayerRole,
    pub money: u32,
    /// The open bet, at most one per round
    pub bet: Option<Bet>,
}

impl Player {
    /// A freshly logged in player. Whoever logs in as `admin` runs the table
    pub fn new(address: Address, name: &str) -> Self {
        let role = if name == "admin" {
            PlayerRole::Admin
        } else {
            PlayerRole::Player
        };

        Self {
            address,
            name: name.to_string(),
            role,
            money: DEFAULT_MONEY,
            bet: None,
        }
    }
}
