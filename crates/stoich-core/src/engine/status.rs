use std::fmt;

/// Outcome of the most recent compilation, as a bit field.
///
/// Zero means success. `-1` means no reaction system has been compiled yet, or the
/// last attempt failed. The positive bits are independent and may combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    pub const UNCOMPILED: Status = Status(-1);
    pub const OK: Status = Status(0);
    /// A reaction or enzyme is missing a reactant.
    pub const MISSING_REACTANT: Status = Status(1);
    /// A Michaelis-Menten enzyme is missing a substrate or has no single enzyme.
    pub const MISSING_MM_SUBSTRATE: Status = Status(2);
    pub const NO_COMPARTMENT: Status = Status(4);
    pub const NO_SOLVER: Status = Status(8);
    pub const NOTHING_ON_PATH: Status = Status(16);

    pub fn bits(self) -> i32 {
        self.0
    }

    pub fn is_ok(self) -> bool {
        self == Status::OK
    }

    pub fn is_uncompiled(self) -> bool {
        self == Status::UNCOMPILED
    }

    /// Whether every bit of `flag` is set. Never true for an uncompiled status.
    pub fn contains(self, flag: Status) -> bool {
        self.0 >= 0 && flag.0 > 0 && self.0 & flag.0 == flag.0
    }

    /// Sets the bits of `flag`, starting from zero if the status was uncompiled.
    pub fn insert(&mut self, flag: Status) {
        self.0 = self.0.max(0) | flag.0.max(0);
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::UNCOMPILED
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_uncompiled() {
        assert_eq!(Status::default().bits(), -1);
        assert!(!Status::default().contains(Status::MISSING_REACTANT));
    }

    #[test]
    fn warning_bits_combine() {
        let mut status = Status::OK;
        status.insert(Status::MISSING_REACTANT);
        status.insert(Status::MISSING_MM_SUBSTRATE);
        assert_eq!(status.bits(), 3);
        assert!(status.contains(Status::MISSING_REACTANT));
        assert!(status.contains(Status::MISSING_MM_SUBSTRATE));
        assert!(!status.contains(Status::NO_SOLVER));
    }

    #[test]
    fn insert_on_uncompiled_starts_from_zero() {
        let mut status = Status::UNCOMPILED;
        status.insert(Status::NO_COMPARTMENT);
        assert_eq!(status.bits(), 4);
    }
}
