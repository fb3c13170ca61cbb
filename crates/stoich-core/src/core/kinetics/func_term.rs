use super::expr::{ExprError, Expression};

/// An expression together with the pool indices feeding its variable slots.
///
/// `args[i]` is the pool index read for variable `x{i}`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpression {
    expr: Expression,
    args: Vec<usize>,
}

impl BoundExpression {
    /// Binds `args` to the expression's variables.
    ///
    /// The argument count must match the number of declared variables exactly.
    pub fn new(expr: Expression, args: Vec<usize>) -> Result<Self, ExprError> {
        if args.len() != expr.num_vars() {
            return Err(ExprError::ArgumentCount {
                expr: expr.source().to_string(),
                expected: expr.num_vars(),
                found: args.len(),
            });
        }
        Ok(Self { expr, args })
    }

    pub fn expr(&self) -> &Expression {
        &self.expr
    }

    pub fn args(&self) -> &[usize] {
        &self.args
    }

    /// Replaces the expression, keeping the bound arguments.
    pub fn set_expr(&mut self, expr: Expression) -> Result<(), ExprError> {
        if expr.num_vars() != self.args.len() {
            return Err(ExprError::ArgumentCount {
                expr: expr.source().to_string(),
                expected: expr.num_vars(),
                found: self.args.len(),
            });
        }
        self.expr = expr;
        Ok(())
    }

    pub fn eval(&self, s: &[f64], t: f64) -> f64 {
        let vars: Vec<f64> = self
            .args
            .iter()
            .map(|&i| s.get(i).copied().unwrap_or(0.0))
            .collect();
        self.expr.eval(&vars, t)
    }
}

/// An algebraic term that assigns a pool's value each step.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncTerm {
    func: BoundExpression,
    target: usize,
    /// Multiplies the expression value; `NA * volume` for concentration targets.
    vol_scale: f64,
}

impl FuncTerm {
    pub fn new(func: BoundExpression, target: usize, vol_scale: f64) -> Self {
        Self {
            func,
            target,
            vol_scale,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn vol_scale(&self) -> f64 {
        self.vol_scale
    }

    pub fn set_vol_scale(&mut self, vol_scale: f64) {
        self.vol_scale = vol_scale;
    }

    pub fn func(&self) -> &BoundExpression {
        &self.func
    }

    pub fn set_expr(&mut self, expr: Expression) -> Result<(), ExprError> {
        self.func.set_expr(expr)
    }

    pub fn eval(&self, s: &[f64], t: f64) -> f64 {
        self.func.eval(s, t) * self.vol_scale
    }

    /// Writes the scaled value into the target slot of `s`.
    pub fn eval_pool(&self, s: &mut [f64], t: f64) {
        let value = self.eval(s, t);
        if let Some(slot) = s.get_mut(self.target) {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(src: &str, args: Vec<usize>) -> BoundExpression {
        let expr = Expression::compile(src, args.len()).unwrap();
        BoundExpression::new(expr, args).unwrap()
    }

    #[test]
    fn argument_count_must_match_declared_variables() {
        let expr = Expression::compile("x0 + x1", 2).unwrap();
        let err = BoundExpression::new(expr, vec![0]).unwrap_err();
        assert_eq!(
            err,
            ExprError::ArgumentCount {
                expr: "x0 + x1".to_string(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn eval_reads_arguments_in_slot_order() {
        let func = bound("x0 - x1", vec![2, 0]);
        let s = [1.0, 0.0, 5.0];
        assert_eq!(func.eval(&s, 0.0), 4.0);
    }

    #[test]
    fn eval_pool_writes_scaled_value_into_target() {
        let term = FuncTerm::new(bound("x0 * 2.0", vec![0]), 1, 10.0);
        let mut s = [3.0, 0.0];
        term.eval_pool(&mut s, 0.0);
        assert_eq!(s, [3.0, 60.0]);
    }

    #[test]
    fn set_expr_keeps_arguments() {
        let mut term = FuncTerm::new(bound("x0", vec![0]), 1, 1.0);
        term.set_expr(Expression::compile("x0 + 1.0", 1).unwrap())
            .unwrap();
        assert_eq!(term.eval(&[2.0, 0.0], 0.0), 3.0);
        assert!(term
            .set_expr(Expression::compile("x0 + x1", 2).unwrap())
            .is_err());
    }
}
