pub mod bets;
pub mod player;

use std::collections::HashMap;

use bets::{describe_roll, Bet, BetPosition};
use player::{Player, PlayerRole};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::address::Address;

/// A text message the table wants delivered to a peer
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Outgoing {
    pub to: Address,
    pub text: String,
}

impl Outgoing {
    fn say(to: &Address, text: impl AsRef<str>) -> Self {
        Self {
            to: to.clone(),
            text: format!("say {}", text.as_ref()),
        }
    }
}

/// The roulette table the server runs. Turns one command from a peer into the replies it
/// causes, it never touches the network itself
pub struct RouletteTable {
    /// Players in the order they logged in. Nobody ever leaves, banned players stay listed
    players: Vec<Player>,
    by_address: HashMap<Address, usize>,
    by_name: HashMap<String, usize>,
    /// Every address a command came from, in order of first contact
    addresses: Vec<Address>,
    rng: StdRng,
}

impl RouletteTable {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A table with a predictable wheel
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            players: Vec::new(),
            by_address: HashMap::new(),
            by_name: HashMap::new(),
            addresses: Vec::new(),
            rng,
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.by_name.get(name).map(|index| &self.players[*index])
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Bans the player called `name`. Returns false if nobody has that name
    pub fn ban(&mut self, name: &str) -> bool {
        let Some(index) = self.by_name.get(name) else {
            return false;
        };

        self.players[*index].role = PlayerRole::Banned;
        true
    }

    /// Runs one command sent by `source`
    pub fn handle(&mut self, source: &Address, content: &str) -> Vec<Outgoing> {
        if !self.addresses.contains(source) {
            self.addresses.push(source.clone());
        }

        if let Some(name) = content.strip_prefix("login ") {
            return self.login(source, name);
        }

        let Some(index) = self.by_address.get(source).copied() else {
            return vec![Outgoing::say(source, "Please log in")];
        };

        if self.players[index].role == PlayerRole::Banned {
            return vec![Outgoing::say(source, "You have been banned")];
        }

        if let Some(bet) = content.strip_prefix("bet ") {
            return vec![self.bet(index, bet)];
        }

        if let Some(message) = content.strip_prefix("say ") {
            return self.say(index, message);
        }

        match content {
            "bets" => vec![self.bets(index)],
            "money" => vec![self.money(index)],
            "roll" => self.roll(index),
            _ => vec![Outgoing::say(
                source,
                format!("Unknown command \"{content}\""),
            )],
        }
    }

    fn login(&mut self, source: &Address, name: &str) -> Vec<Outgoing> {
        if let Some(index) = self.by_address.get(source) {
            let name = &self.players[*index].name;
            return vec![Outgoing::say(
                source,
                format!("{name}, you are already logged in"),
            )];
        }

        if name.is_empty() || self.by_name.contains_key(name) {
            return vec![Outgoing::say(
                source,
                format!("Name \"{name}\" is not available"),
            )];
        }

        let player = Player::new(source.clone(), name);
        let role = player.role;
        let index = self.players.len();
        self.players.push(player);
        self.by_address.insert(source.clone(), index);
        self.by_name.insert(name.to_string(), index);

        log::info!("{name} logged in from {source} as {role}");
        vec![Outgoing::say(
            source,
            format!("Login successful. Your role is {role}"),
        )]
    }

    fn bet(&mut self, index: usize, text: &str) -> Outgoing {
        let player = &mut self.players[index];
        if player.role != PlayerRole::Player {
            return Outgoing::say(
                &player.address,
                format!(
                    "Only players can place bets, your current role is {}",
                    player.role
                ),
            );
        }

        if let Some(bet) = player.bet {
            return Outgoing::say(
                &player.address,
                format!("You already have bet {}", bet.amount),
            );
        }

        let bet = match Bet::parse(text) {
            Ok(bet) => bet,
            Err(e) => {
                log::debug!("{} sent a bad bet: {e}", player.name);

                let mut reply = format!(
                    "{text} is not a valid bet. Use \"bet <position> <amount>\" where position can be:\n"
                );
                for position in BetPosition::all() {
                    reply += &position.describe();
                    reply += "; ";
                }

                return Outgoing::say(&player.address, reply);
            }
        };

        if bet.amount > player.money {
            return Outgoing::say(
                &player.address,
                format!("Insufficient money. You only have {}", player.money),
            );
        }

        player.money -= bet.amount;
        player.bet = Some(bet);
        Outgoing::say(
            &player.address,
            format!("Your current bet is now {} on {}", bet.amount, bet.position),
        )
    }

    fn bets(&self, index: usize) -> Outgoing {
        let me = &self.players[index];
        let mut text = String::from("Current bets are:\n\n");
        let mut any_bets = false;

        for player in self.players.iter() {
            let Some(bet) = player.bet else {
                continue;
            };

            text += &player.name;
            if player.name == me.name {
                text += " (you)";
            }
            text += &format!(" -> {} on {}\n", bet.amount, bet.position.describe());
            any_bets = true;
        }

        if !any_bets {
            text = String::from("There are no bets yet\n");
        }

        Outgoing::say(&me.address, text)
    }

    fn money(&self, index: usize) -> Outgoing {
        let me = &self.players[index];
        let mut text = String::from("Current players money:\n\n");
        let mut any_money = false;

        for player in self.players.iter() {
            if player.role != PlayerRole::Player {
                continue;
            }

            text += &player.name;
            if player.name == me.name {
                text += " (you)";
            }
            text += &format!(" -> {}\n", player.money);
            any_money = true;
        }

        if !any_money {
            text = String::from("There are no players yet\n");
        }

        Outgoing::say(&me.address, text)
    }

    fn roll(&mut self, index: usize) -> Vec<Outgoing> {
        let roller = &self.players[index];
        if roller.role != PlayerRole::Admin {
            return vec![Outgoing::say(
                &roller.address,
                format!(
                    "Only admins can roll the roulette, your current role is {}",
                    roller.role
                ),
            )];
        }

        if self.players.iter().all(|player| player.bet.is_none()) {
            return vec![Outgoing::say(&roller.address, "There are no bets yet")];
        }

        let roll = self.rng.gen_range(0..=36);
        self.settle(roll)
    }

    /// Pays out every open bet against `roll`, clears them and tells every player the outcome
    pub(crate) fn settle(&mut self, roll: u8) -> Vec<Outgoing> {
        log::info!("Roulette stopped on {roll}");

        let mut winners = Vec::new();
        for player in self.players.iter_mut() {
            let Some(bet) = player.bet.take() else {
                continue;
            };

            let payout = bet.payout(roll);
            if payout > 0 {
                player.money = player.money.saturating_add(payout);
                winners.push((player.name.clone(), bet, payout - bet.amount));
            }
        }

        self.players
            .iter()
            .map(|recipient| {
                let mut text = format!("Roulette stopped on {} resulting in:\n", describe_roll(roll));
                for (name, bet, won) in winners.iter() {
                    text += name;
                    if *name == recipient.name {
                        text += " (you)";
                    }
                    text += &format!(
                        " placed {} on {} and won {won}\n",
                        bet.amount,
                        bet.position.describe()
                    );
                }

                Outgoing::say(&recipient.address, text)
            })
            .collect()
    }

    fn say(&self, index: usize, message: &str) -> Vec<Outgoing> {
        let me = &self.players[index];
        self.players
            .iter()
            .filter(|player| player.name != me.name)
            .map(|player| Outgoing::say(&player.address, format!("{}: {message}", me.name)))
            .collect()
    }
}

impl Default for RouletteTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Cuts `text` down to at most `max` bytes without splitting a character
pub fn clip(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }

    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}
