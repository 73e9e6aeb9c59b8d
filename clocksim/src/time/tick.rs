use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Mul},
};

/// One unit of global time, advanced by the driver.
#[derive(PartialEq, PartialOrd, Ord, Eq, Copy, Clone, Default, Hash)]
pub struct Tick(pub usize);

impl Add for Tick {
    type Output = Tick;

    fn add(self, rhs: Self) -> Self::Output {
        Tick(self.0 + rhs.0)
    }
}

impl AddAssign<Tick> for Tick {
    fn add_assign(&mut self, rhs: Tick) {
        self.0 += rhs.0
    }
}

impl AddAssign<usize> for Tick {
    fn add_assign(&mut self, rhs: usize) {
        self.0 += rhs
    }
}

// Steps executed by a machine of rate `usize` over `Tick` global ticks
impl Mul<Tick> for usize {
    type Output = Self;

    fn mul(self, rhs: Tick) -> Self::Output {
        self * rhs.0
    }
}

impl Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tick({})", self.0)
    }
}
