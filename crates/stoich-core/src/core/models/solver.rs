use std::fmt;

/// The family of an external numeric solver.
///
/// `Ksolve` integrates deterministically, `Gsolve` stochastically (and therefore wants
/// one-way rate terms), `Dsolve` handles diffusion between voxels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    Ksolve,
    Gsolve,
    Dsolve,
}

impl SolverKind {
    pub fn is_kinetic(self) -> bool {
        matches!(self, SolverKind::Ksolve | SolverKind::Gsolve)
    }

    pub fn is_stochastic(self) -> bool {
        self == SolverKind::Gsolve
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolverKind::Ksolve => "ksolve",
            SolverKind::Gsolve => "gsolve",
            SolverKind::Dsolve => "dsolve",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ksolve" => Ok(SolverKind::Ksolve),
            "gsolve" => Ok(SolverKind::Gsolve),
            "dsolve" => Ok(SolverKind::Dsolve),
            other => Err(format!("unknown solver kind '{}'", other)),
        }
    }
}

/// A handle record for an external solver instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solver {
    pub name: String,
    pub kind: SolverKind,
}

impl Solver {
    pub fn new(name: &str, kind: SolverKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kinds_case_insensitively() {
        assert_eq!("Gsolve".parse::<SolverKind>(), Ok(SolverKind::Gsolve));
        assert_eq!("ksolve".parse::<SolverKind>(), Ok(SolverKind::Ksolve));
        assert!("lsoda".parse::<SolverKind>().is_err());
    }

    #[test]
    fn kind_predicates() {
        assert!(SolverKind::Ksolve.is_kinetic());
        assert!(SolverKind::Gsolve.is_stochastic());
        assert!(!SolverKind::Dsolve.is_kinetic());
        assert_eq!(SolverKind::Dsolve.to_string(), "dsolve");
    }
}
