use evalexpr_jit::Equation;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Name of the time variable available to every expression.
pub const TIME_VAR: &str = "t";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("Failed to compile expression '{expr}': {message}")]
    Compile { expr: String, message: String },

    #[error("Expression '{expr}' expects {expected} arguments but {found} were bound")]
    ArgumentCount {
        expr: String,
        expected: usize,
        found: usize,
    },
}

/// A compiled arithmetic expression over the variables `x0..x{n-1}` and `t`.
///
/// The expression is JIT-compiled once; clones share the compiled code.
#[derive(Clone)]
pub struct Expression {
    source: String,
    num_vars: usize,
    equation: Arc<Equation>,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("source", &self.source)
            .field("num_vars", &self.num_vars)
            .finish()
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.num_vars == other.num_vars
    }
}

impl Expression {
    /// Compiles `source` with `num_vars` positional variables.
    pub fn compile(source: &str, num_vars: usize) -> Result<Self, ExprError> {
        let var_map: HashMap<String, _> = (0..num_vars)
            .map(|i| (format!("x{}", i), i as _))
            .chain(std::iter::once((TIME_VAR.to_string(), num_vars as _)))
            .collect();

        let equation = Equation::from_var_map(source.to_string(), &var_map).map_err(|e| {
            ExprError::Compile {
                expr: source.to_string(),
                message: format!("{e:?}"),
            }
        })?;

        Ok(Self {
            source: source.to_string(),
            num_vars,
            equation: Arc::new(equation),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn num_vars(&self) -> usize {
        self.num_vars
    }

    /// Evaluates the expression with the given variable values and time.
    ///
    /// Missing trailing values read as zero and surplus values are ignored. A
    /// numeric failure inside the compiled code yields zero.
    pub fn eval(&self, vars: &[f64], t: f64) -> f64 {
        let mut input = vec![0.0; self.num_vars + 1];
        for (slot, value) in input.iter_mut().zip(vars) {
            *slot = *value;
        }
        input[self.num_vars] = t;
        self.equation.eval(&input).unwrap_or(0.0)
    }
}
