use super::delegate::SolverBinding;
use super::ids::{CompartmentId, ObjectId};
use super::schedule::Tick;
use std::fmt;
use std::str::FromStr;

/// A chemical species container.
#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    /// Initial concentration in millimolar.
    pub conc_init: f64,
    /// Current molecule count when the pool runs natively.
    pub n: f64,
    /// Buffered pools are clamped at their initial value.
    pub buffered: bool,
}

impl Pool {
    pub fn new(conc_init: f64, buffered: bool) -> Self {
        Self {
            conc_init,
            n: 0.0,
            buffered,
        }
    }
}

/// An elementary mass-action reaction.
///
/// Substrate and product lists may name the same pool more than once to express a
/// stoichiometry greater than one.
#[derive(Debug, Clone, PartialEq)]
pub struct Reac {
    pub kf: f64,
    pub kb: f64,
    pub substrates: Vec<ObjectId>,
    pub products: Vec<ObjectId>,
}

/// A full three-step enzyme reaction: `E + S <-> C -> E + P`.
#[derive(Debug, Clone, PartialEq)]
pub struct Enz {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub enzymes: Vec<ObjectId>,
    pub complex: Option<ObjectId>,
    pub substrates: Vec<ObjectId>,
    pub products: Vec<ObjectId>,
}

/// A Michaelis-Menten enzyme reaction.
///
/// The enzyme appears only inside the rate law, never in the stoichiometry.
#[derive(Debug, Clone, PartialEq)]
pub struct MMEnz {
    /// Michaelis constant in millimolar.
    pub km: f64,
    pub kcat: f64,
    pub enzymes: Vec<ObjectId>,
    pub substrates: Vec<ObjectId>,
    pub products: Vec<ObjectId>,
}

/// The field of the target object a function writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetMethod {
    /// Adds the function value to the pool's rate of change.
    Increment,
    /// Sets the forward rate constant of a reaction, in number units.
    SetNumKf,
    SetN,
    SetNInit,
    SetConc,
    SetConcInit,
}

impl TargetMethod {
    /// Whether the method writes a concentration, requiring a volume scale.
    pub fn is_concentration(self) -> bool {
        matches!(self, TargetMethod::SetConc | TargetMethod::SetConcInit)
    }
}

impl FromStr for TargetMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "increment" => Ok(TargetMethod::Increment),
            "set-num-kf" => Ok(TargetMethod::SetNumKf),
            "set-n" => Ok(TargetMethod::SetN),
            "set-n-init" => Ok(TargetMethod::SetNInit),
            "set-conc" => Ok(TargetMethod::SetConc),
            "set-conc-init" => Ok(TargetMethod::SetConcInit),
            other => Err(format!("unknown function target method '{}'", other)),
        }
    }
}

impl fmt::Display for TargetMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetMethod::Increment => "increment",
            TargetMethod::SetNumKf => "set-num-kf",
            TargetMethod::SetN => "set-n",
            TargetMethod::SetNInit => "set-n-init",
            TargetMethod::SetConc => "set-conc",
            TargetMethod::SetConcInit => "set-conc-init",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionOutput {
    pub target: ObjectId,
    pub method: TargetMethod,
}

/// An algebraic function of pool values.
///
/// Inputs are wired in variable-slot order: `inputs[i]` feeds the expression variable
/// `x{i}`. The variable `t` is simulation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub expr: String,
    /// Number of `x` variables the expression declares.
    pub num_vars: usize,
    pub inputs: Vec<ObjectId>,
    pub outputs: Vec<FunctionOutput>,
}

impl Function {
    pub fn new(expr: &str, num_vars: usize) -> Self {
        Self {
            expr: expr.to_string(),
            num_vars,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// The method bound on the first output, which decides the function's role.
    pub fn primary_method(&self) -> Option<TargetMethod> {
        self.outputs.first().map(|o| o.method)
    }
}

/// The closed set of model object kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Pool(Pool),
    Reac(Reac),
    Enz(Enz),
    MMEnz(MMEnz),
    Function(Function),
    /// Any object the reaction-system compiler does not handle, such as tables or
    /// graphs swept in by a wildcard.
    Other { class: String },
}

impl ObjectKind {
    /// The conventional class name, used for scheduler defaults and diagnostics.
    pub fn class_name(&self) -> &str {
        match self {
            ObjectKind::Pool(p) if p.buffered => "BufPool",
            ObjectKind::Pool(_) => "Pool",
            ObjectKind::Reac(_) => "Reac",
            ObjectKind::Enz(_) => "Enz",
            ObjectKind::MMEnz(_) => "MMenz",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Other { class } => class,
        }
    }

    pub fn is_kinetic(&self) -> bool {
        !matches!(self, ObjectKind::Other { .. })
    }

    /// Substrates and products directly wired to a reaction-like object.
    pub fn reactant_neighbors(&self) -> Option<(&[ObjectId], &[ObjectId])> {
        match self {
            ObjectKind::Reac(r) => Some((&r.substrates, &r.products)),
            ObjectKind::Enz(e) => Some((&e.substrates, &e.products)),
            ObjectKind::MMEnz(e) => Some((&e.substrates, &e.products)),
            _ => None,
        }
    }
}

/// A named object living in one compartment of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelObject {
    pub name: String,
    pub compartment: CompartmentId,
    pub kind: ObjectKind,
    pub(crate) tick: Tick,
    pub(crate) binding: Option<SolverBinding>,
}

impl ModelObject {
    pub fn new(name: &str, compartment: CompartmentId, kind: ObjectKind, tick: Tick) -> Self {
        Self {
            name: name.to_string(),
            compartment,
            kind,
            tick,
            binding: None,
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn set_tick(&mut self, tick: Tick) {
        self.tick = tick;
    }

    pub fn class_name(&self) -> &str {
        self.kind.class_name()
    }

    pub fn as_pool(&self) -> Option<&Pool> {
        match &self.kind {
            ObjectKind::Pool(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_pool_mut(&mut self) -> Option<&mut Pool> {
        match &mut self.kind {
            ObjectKind::Pool(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_reac(&self) -> Option<&Reac> {
        match &self.kind {
            ObjectKind::Reac(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_reac_mut(&mut self) -> Option<&mut Reac> {
        match &mut self.kind {
            ObjectKind::Reac(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_enz(&self) -> Option<&Enz> {
        match &self.kind {
            ObjectKind::Enz(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_enz_mut(&mut self) -> Option<&mut Enz> {
        match &mut self.kind {
            ObjectKind::Enz(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_mmenz(&self) -> Option<&MMEnz> {
        match &self.kind {
            ObjectKind::MMEnz(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_mmenz_mut(&mut self) -> Option<&mut MMEnz> {
        match &mut self.kind {
            ObjectKind::MMEnz(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut Function> {
        match &mut self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }
}
