use std::fmt;

use thiserror::Error;

/// Longest bet amount accepted, in digits
pub const MAX_BET_DIGITS: usize = 5;

/// Numbers the wheel colours black, every other non-zero number is red
const BLACK: [u8; 18] = [
    2, 4, 6, 8, 10, 11, 13, 15, 17, 20, 22, 24, 26, 28, 29, 31, 33, 35,
];

/// Where on the table a bet is placed
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BetPosition {
    Zero,
    Red,
    Black,
    Odd,
    Even,
    Number(u8),
}

impl BetPosition {
    /// Every position in table order
    pub fn all() -> impl Iterator<Item = BetPosition> {
        [
            BetPosition::Zero,
            BetPosition::Red,
            BetPosition::Black,
            BetPosition::Odd,
            BetPosition::Even,
        ]
        .into_iter()
        .chain((1..=36).map(BetPosition::Number))
    }

    pub fn parse(name: &str) -> Option<BetPosition> {
        match name {
            "zero" => Some(BetPosition::Zero),
            "red" => Some(BetPosition::Red),
            "black" => Some(BetPosition::Black),
            "odd" => Some(BetPosition::Odd),
            "even" => Some(BetPosition::Even),
            number => match number.parse::<u8>() {
                Ok(n @ 1..=36) if !number.starts_with(['0', '+']) => Some(BetPosition::Number(n)),
                _ => None,
            },
        }
    }

    /// What a winning bet pays on top of the stake
    pub fn coefficient(&self) -> u32 {
        match self {
            BetPosition::Zero | BetPosition::Number(_) => 35,
            BetPosition::Red | BetPosition::Black | BetPosition::Odd | BetPosition::Even => 1,
        }
    }

    pub fn wins(&self, roll: u8) -> bool {
        match self {
            BetPosition::Zero => roll == 0,
            BetPosition::Red => is_red(roll),
            BetPosition::Black => is_black(roll),
            BetPosition::Odd => roll % 2 == 1,
            BetPosition::Even => roll % 2 == 0,
            BetPosition::Number(n) => roll == *n,
        }
    }

    /// e.g. `red (x1)`
    pub fn describe(&self) -> String {
        format!("{self} (x{})", self.coefficient())
    }
}

impl fmt::Display for BetPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetPosition::Zero => f.write_str("zero"),
            BetPosition::Red => f.write_str("red"),
            BetPosition::Black => f.write_str("black"),
            BetPosition::Odd => f.write_str("odd"),
            BetPosition::Even => f.write_str("even"),
            BetPosition::Number(n) => write!(f, "{n}"),
        }
    }
}

pub fn is_black(roll: u8) -> bool {
    BLACK.contains(&roll)
}

pub fn is_red(roll: u8) -> bool {
    roll != 0 && !is_black(roll)
}

/// A bet as the player typed it, before checking whether they can afford it
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Bet {
    pub position: BetPosition,
    pub amount: u32,
}

impl Bet {
    /// Parses `<position> <amount>`
    pub fn parse(text: &str) -> Result<Bet, BetError> {
        let (position, amount) = text.split_once(' ').unwrap_or((text, ""));
        let position = BetPosition::parse(position)
            .ok_or_else(|| BetError::UnknownPosition(position.to_string()))?;

        let amount = amount.trim();
        let digits = amount.trim_start_matches(['+', '-']);
        if digits.is_empty() || digits.len() > MAX_BET_DIGITS {
            return Err(BetError::InvalidAmount(amount.to_string()));
        }

        let amount = match amount.parse::<i64>() {
            Ok(amount) if amount > 0 => amount as u32,
            _ => return Err(BetError::InvalidAmount(amount.to_string())),
        };

        Ok(Bet { position, amount })
    }

    /// The whole amount returned to the player if `roll` wins, stake included
    pub fn payout(&self, roll: u8) -> u32 {
        if self.position.wins(roll) {
            self.amount * self.position.coefficient() + self.amount
        } else {
            0
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BetError {
    #[error("unknown bet position {0:?}")]
    UnknownPosition(String),

    #[error("invalid bet amount {0:?}")]
    InvalidAmount(String),
}

/// Describes every roll outcome, e.g. `17 odd black`
pub fn describe_roll(roll: u8) -> String {
    let mut text = roll.to_string();
    text += if roll % 2 == 1 { " odd" } else { " even" };
    if is_red(roll) {
        text += " red";
    }
    if is_black(roll) {
        text += " black";
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_41_positions() {
        let positions: Vec<_> = BetPosition::all().collect();
        assert_eq!(positions.len(), 41);
        assert_eq!(positions[0].describe(), "zero (x35)");
        assert_eq!(positions[1].describe(), "red (x1)");
        assert_eq!(positions[40].describe(), "36 (x35)");
    }

    #[test]
    fn test_colours() {
        assert!(!is_red(0) && !is_black(0));
        assert!(is_red(1));
        assert!(is_black(2));
        assert!(is_black(35));
        assert!(is_red(36));
        assert_eq!((0..=36).filter(|n| is_red(*n)).count(), 18);
    }

    #[test]
    fn test_parse_bet() {
        assert_eq!(
            Bet::parse("red 100"),
            Ok(Bet {
                position: BetPosition::Red,
                amount: 100
            })
        );
        assert_eq!(Bet::parse("17 5").unwrap().position, BetPosition::Number(17));
        assert!(Bet::parse("+5").is_err());

        assert!(matches!(Bet::parse("green 5"), Err(BetError::UnknownPosition(_))));
        assert!(matches!(Bet::parse("37 5"), Err(BetError::UnknownPosition(_))));
        assert!(matches!(Bet::parse("0 5"), Err(BetError::UnknownPosition(_))));
        assert!(matches!(Bet::parse("red"), Err(BetError::InvalidAmount(_))));
        assert!(matches!(Bet::parse("red 0"), Err(BetError::InvalidAmount(_))));
        assert!(matches!(Bet::parse("red -5"), Err(BetError::InvalidAmount(_))));
        assert!(matches!(Bet::parse("red 123456"), Err(BetError::InvalidAmount(_))));
        assert!(matches!(Bet::parse("red 1x"), Err(BetError::InvalidAmount(_))));
        assert_eq!(Bet::parse("red 99999").unwrap().amount, 99_999);
    }

    #[test]
    fn test_payout() {
        let red = Bet::parse("red 10").unwrap();
        assert_eq!(red.payout(1), 20);
        assert_eq!(red.payout(2), 0);

        let straight = Bet::parse("7 10").unwrap();
        assert_eq!(straight.payout(7), 360);
        assert_eq!(straight.payout(8), 0);

        let zero = Bet::parse("zero 2").unwrap();
        assert_eq!(zero.payout(0), 72);
        assert_eq!(Bet::parse("even 2").unwrap().payout(0), 4);
    }

    #[test]
    fn test_describe_roll() {
        assert_eq!(describe_roll(0), "0 even");
        assert_eq!(describe_roll(17), "17 odd black");
        assert_eq!(describe_roll(1), "1 odd red");
    }
}
