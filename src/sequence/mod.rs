use std::{
    fmt,
    ops::{Add, AddAssign},
};

/// The number a data packet carries on the wire. Counts up by one per send, per peer and
/// direction
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct SequenceNumber(i32);

impl SequenceNumber {
    /// Reserved for punch-through probes, also the value of a send counter that has not sent
    /// anything yet
    pub const PROBE: SequenceNumber = SequenceNumber(-1);

    /// The first number a data packet is sent with, and the first one a receiver expects
    pub const FIRST: SequenceNumber = SequenceNumber(0);

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn raw(&self) -> i32 {
        self.0
    }

    /// The number following this one
    pub fn next(&self) -> Self {
        *self + Self(1)
    }
}

impl Add for SequenceNumber {
    type Output = SequenceNumber;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for SequenceNumber {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_from_probe() {
        let mut number = SequenceNumber::PROBE;
        number += SequenceNumber::new(1);
        assert_eq!(number, SequenceNumber::FIRST);
        assert_eq!(number.next().raw(), 1);
        assert!(SequenceNumber::PROBE < SequenceNumber::FIRST);
    }
}
