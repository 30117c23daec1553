//! The pure expression evaluator: depth-bounded, single-pass,
//! with per-index memoisation, recursing across scene boundaries through a
//! [`SceneResolver`].

use boldui_protocol::{OpId, OpsOperation, SceneId, Value, VarId};

use crate::{EvalContext, EvalError};

/// Depth bound for cross-scene recursion, guarding against a cycle that
/// slips past static validation (spec §4.B "a cycle through OpIds is
/// fatal").
const MAX_DEPTH: u32 = 256;

/// Gives the evaluator read access to one scene's ops and (for cross-scene
/// `OpId`s) lets it recurse into another attached scene's evaluator.
///
/// Implemented by the scene-graph store (`boldui-scene`); kept as a trait
/// here so the pure evaluator doesn't depend on the tree/ownership model.
pub trait SceneResolver {
    fn ops(&self, scene: SceneId) -> Option<&[OpsOperation]>;
    fn var(&self, var: &VarId) -> Option<&Value>;
    /// Called once per `Var` read during a pass, so the caller can invert
    /// it into a watch dependency set.
    fn record_var_read(&mut self, var: &VarId);
    /// Whether `scene` is reachable from the root (spec §4.B: cross-scene
    /// reads require "scenes must be attached").
    fn is_attached(&self, scene: SceneId) -> bool;
}

/// One scene's memoised evaluation pass. Re-created per pass (spec §4.B:
/// "a length-len(ops) array of Option<Value>").
pub struct Evaluator<'a, R: SceneResolver> {
    scene: SceneId,
    ops: &'a [OpsOperation],
    memo: Vec<Option<Value>>,
    ctx: &'a EvalContext,
    resolver: &'a mut R,
}

impl<'a, R: SceneResolver> Evaluator<'a, R> {
    pub fn new(scene: SceneId, ops: &'a [OpsOperation], ctx: &'a EvalContext, resolver: &'a mut R) -> Self {
        Evaluator { scene, ops, memo: vec![None; ops.len()], ctx, resolver }
    }

    pub fn evaluate(&mut self, op: OpId) -> Result<Value, EvalError> {
        self.evaluate_depth(op, 0)
    }

    fn evaluate_depth(&mut self, op: OpId, depth: u32) -> Result<Value, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::DepthLimitExceeded { op });
        }

        if op.scene_id != self.scene {
            if !self.resolver.is_attached(op.scene_id) {
                return Err(EvalError::UnattachedScene(op.scene_id));
            }
            let foreign_ops = self
                .resolver
                .ops(op.scene_id)
                .ok_or(EvalError::UnattachedScene(op.scene_id))?;
            // Cross-scene reads can't share this pass's memo (a different
            // scene may be mid-evaluation concurrently in a wider walk), so
            // they get their own short-lived evaluator over the same
            // resolver and context (spec §4.B: "recurse into that scene's
            // evaluator").
            let foreign_ops: Vec<OpsOperation> = foreign_ops.to_vec();
            let mut foreign = Evaluator {
                scene: op.scene_id,
                ops: &foreign_ops,
                memo: vec![None; foreign_ops.len()],
                ctx: self.ctx,
                resolver: self.resolver,
            };
            return foreign.evaluate_depth(op, depth + 1);
        }

        let index = op.index as usize;
        if let Some(v) = self.memo.get(index).and_then(|v| v.clone()) {
            return Ok(v);
        }
        let node = self
            .ops
            .get(index)
            .ok_or(EvalError::BadOperand { op, reason: "index out of range" })?
            .clone();
        let value = self.eval_node(&node, op, depth)?;
        if let Some(slot) = self.memo.get_mut(index) {
            *slot = Some(value.clone());
        }
        Ok(value)
    }

    fn eval_node(&mut self, node: &OpsOperation, op: OpId, depth: u32) -> Result<Value, EvalError> {
        use OpsOperation::*;
        match node {
            Value(v) => Ok(v.clone()),
            Var(var) => {
                self.resolver.record_var_read(var);
                self.resolver
                    .var(var)
                    .cloned()
                    .ok_or_else(|| EvalError::UnknownVar(var.clone()))
            }
            GetTime => Ok(value::double(self.ctx.time.seconds())),
            GetTimeAndClamp(low, high) => {
                let low = self.as_f64(*low, depth)?;
                let high = self.as_f64(*high, depth)?;
                // Saturating, not modular.
                Ok(value::double(self.ctx.time.seconds().clamp(low.min(high), low.max(high))))
            }

            Add(a, b) => self.numeric_binop(op, *a, *b, depth, |x, y| x + y),
            Mul(a, b) => self.numeric_binop(op, *a, *b, depth, |x, y| x * y),
            Div(a, b) => self.checked_numeric_binop(op, *a, *b, depth, |x, y| {
                if y == 0.0 {
                    None
                } else {
                    Some(x / y)
                }
            }),
            FloorDiv(a, b) => self.checked_numeric_binop(op, *a, *b, depth, |x, y| {
                if y == 0.0 {
                    None
                } else {
                    Some((x / y).floor())
                }
            }),
            Min(a, b) => self.numeric_binop(op, *a, *b, depth, f64::min),
            Max(a, b) => self.numeric_binop(op, *a, *b, depth, f64::max),
            Or(a, b) => {
                let av = self.evaluate_depth(*a, depth + 1)?;
                if av.is_truthy() {
                    Ok(av)
                } else {
                    self.evaluate_depth(*b, depth + 1)
                }
            }
            And(a, b) => {
                let av = self.evaluate_depth(*a, depth + 1)?;
                if !av.is_truthy() {
                    Ok(av)
                } else {
                    self.evaluate_depth(*b, depth + 1)
                }
            }
            GreaterThan(a, b) => {
                let av = self.as_f64(*a, depth)?;
                let bv = self.as_f64(*b, depth)?;
                Ok(value::bool(av > bv))
            }
            Eq(a, b) => {
                let av = self.evaluate_depth(*a, depth + 1)?;
                let bv = self.evaluate_depth(*b, depth + 1)?;
                Ok(value::bool(av == bv))
            }
            Neq(a, b) => {
                let av = self.evaluate_depth(*a, depth + 1)?;
                let bv = self.evaluate_depth(*b, depth + 1)?;
                Ok(value::bool(av != bv))
            }

            Neg(a) => {
                let v = self.evaluate_depth(*a, depth + 1)?;
                match v {
                    Value::Sint64(i) => Ok(Value::Sint64(-i)),
                    Value::Double(d) => Ok(value::double(-d)),
                    _ => Err(EvalError::TypeMismatch { op, expected: "numeric", got: v.kind() }),
                }
            }
            Abs(a) => {
                let v = self.evaluate_depth(*a, depth + 1)?;
                match v {
                    Value::Sint64(i) => Ok(Value::Sint64(i.abs())),
                    Value::Double(d) => Ok(value::double(d.abs())),
                    _ => Err(EvalError::BadOperand { op, reason: "abs on non-numeric value" }),
                }
            }
            Sin(a) => Ok(value::double(self.as_f64(*a, depth)?.sin())),
            Cos(a) => Ok(value::double(self.as_f64(*a, depth)?.cos())),
            ToString(a) => {
                let v = self.evaluate_depth(*a, depth + 1)?;
                Ok(Value::String(v.format()))
            }

            MakePoint(l, t) => Ok(Value::Point(boldui_protocol::Point::new(
                self.as_f64(*l, depth)?,
                self.as_f64(*t, depth)?,
            ))),
            MakeRectFromPoints(lt, rb) => {
                let lt = self.evaluate_depth(*lt, depth + 1)?;
                let rb = self.evaluate_depth(*rb, depth + 1)?;
                match (lt, rb) {
                    (Value::Point(lt), Value::Point(rb)) => {
                        Ok(Value::Rect(boldui_protocol::Rect::from_points(lt, rb)))
                    }
                    _ => Err(EvalError::BadOperand { op, reason: "MakeRectFromPoints needs two points" }),
                }
            }
            MakeRectFromSides(l, t, r, b) => Ok(Value::Rect(boldui_protocol::Rect::new(
                self.as_f64(*l, depth)?,
                self.as_f64(*t, depth)?,
                self.as_f64(*r, depth)?,
                self.as_f64(*b, depth)?,
            ))),
            MakeColor(r, g, b, a) => {
                let chan = |this: &mut Self, op: OpId| -> Result<u16, EvalError> {
                    match this.evaluate_depth(op, depth + 1)? {
                        Value::Sint64(i) => Ok(i.clamp(0, u16::MAX as i64) as u16),
                        other => Err(EvalError::TypeMismatch { op, expected: "Sint64 channel", got: other.kind() }),
                    }
                };
                Ok(Value::Color(boldui_protocol::Color::new(
                    chan(self, *r)?,
                    chan(self, *g)?,
                    chan(self, *b)?,
                    chan(self, *a)?,
                )))
            }

            If(cond, then, or_else) => {
                // Lazy: only the selected branch is evaluated (spec §9
                // Open Question 1, resolved in favor of laziness).
                let c = self.evaluate_depth(*cond, depth + 1)?;
                if c.is_truthy() {
                    self.evaluate_depth(*then, depth + 1)
                } else {
                    self.evaluate_depth(*or_else, depth + 1)
                }
            }
        }
    }

    fn as_f64(&mut self, op: OpId, depth: u32) -> Result<f64, EvalError> {
        let v = self.evaluate_depth(op, depth + 1)?;
        v.as_f64().ok_or(EvalError::TypeMismatch { op, expected: "numeric", got: v.kind() })
    }

    fn numeric_binop(
        &mut self,
        op: OpId,
        a: OpId,
        b: OpId,
        depth: u32,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, EvalError> {
        let av = self.evaluate_depth(a, depth + 1)?;
        let bv = self.evaluate_depth(b, depth + 1)?;
        numeric_promote(op, av, bv, f)
    }

    fn checked_numeric_binop(
        &mut self,
        op: OpId,
        a: OpId,
        b: OpId,
        depth: u32,
        f: impl Fn(f64, f64) -> Option<f64>,
    ) -> Result<Value, EvalError> {
        let av = self.as_f64(a, depth)?;
        let bv = self.as_f64(b, depth)?;
        f(av, bv).map(value::double).ok_or(EvalError::DivisionByZero { op })
    }
}

/// Numeric coercion rules: Sint64/Double arithmetic promotes to
/// Double; Point broadcasts a scalar to both components; Rect arithmetic is
/// undefined.
fn numeric_promote(op: OpId, a: Value, b: Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    use Value::*;
    match (a, b) {
        (Sint64(x), Sint64(y)) => {
            // Stay integral when both inputs are: this matches `f` applied
            // to floats but rounds back, preserving "3 + 4 == 7" instead of
            // "7.0" for the common case while still promoting mixed
            // arithmetic to Double below.
            let result = f(x as f64, y as f64);
            if result.fract() == 0.0 && result.is_finite() {
                Ok(Sint64(result as i64))
            } else {
                Ok(value::double(result))
            }
        }
        (Sint64(x), Double(y)) | (Double(y), Sint64(x)) => Ok(value::double(f(x as f64, y))),
        (Double(x), Double(y)) => Ok(value::double(f(x, y))),
        (Point(p), Sint64(s)) | (Sint64(s), Point(p)) => {
            Ok(Point(boldui_protocol::Point::new(f(p.left, s as f64), f(p.top, s as f64))))
        }
        (Point(p), Double(s)) | (Double(s), Point(p)) => {
            Ok(Point(boldui_protocol::Point::new(f(p.left, s), f(p.top, s))))
        }
        (Point(p1), Point(p2)) => Ok(Point(boldui_protocol::Point::new(f(p1.left, p2.left), f(p1.top, p2.top)))),
        (Rect(_), _) | (_, Rect(_)) => Err(EvalError::BadOperand { op, reason: "rect arithmetic is undefined" }),
        (a, _) => Err(EvalError::TypeMismatch { op, expected: "numeric", got: a.kind() }),
    }
}

mod value {
    use boldui_protocol::Value;

    pub fn double(v: f64) -> Value {
        Value::Double(v)
    }
    pub fn bool(v: bool) -> Value {
        Value::Sint64(if v { 1 } else { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boldui_protocol::{SceneId, Value as V};
    use std::collections::HashMap;

    struct TestResolver {
        vars: HashMap<VarId, V>,
        reads: Vec<VarId>,
    }
    impl SceneResolver for TestResolver {
        fn ops(&self, _scene: SceneId) -> Option<&[OpsOperation]> {
            None
        }
        fn var(&self, var: &VarId) -> Option<&V> {
            self.vars.get(var)
        }
        fn record_var_read(&mut self, var: &VarId) {
            self.reads.push(var.clone());
        }
        fn is_attached(&self, _scene: SceneId) -> bool {
            true
        }
    }

    fn ctx() -> EvalContext {
        EvalContext::new(crate::TimeSnapshot::default_for_test(100.0), 640, 480)
    }

    fn eval(ops: &[OpsOperation], target: u32) -> Result<V, EvalError> {
        let mut resolver = TestResolver { vars: HashMap::new(), reads: vec![] };
        let c = ctx();
        let mut ev = Evaluator::new(SceneId(1), ops, &c, &mut resolver);
        ev.evaluate(OpId::new(SceneId(1), target))
    }

    #[test]
    fn add_promotes_int_plus_double_to_double() {
        let ops = vec![OpsOperation::Value(V::Sint64(1)), OpsOperation::Value(V::Double(2.5)), OpsOperation::Add(
            OpId::new(SceneId(1), 0),
            OpId::new(SceneId(1), 1),
        )];
        assert_eq!(eval(&ops, 2).unwrap(), V::Double(3.5));
    }

    #[test]
    fn add_keeps_int_plus_int_integral() {
        let ops = vec![OpsOperation::Value(V::Sint64(1)), OpsOperation::Value(V::Sint64(2)), OpsOperation::Add(
            OpId::new(SceneId(1), 0),
            OpId::new(SceneId(1), 1),
        )];
        assert_eq!(eval(&ops, 2).unwrap(), V::Sint64(3));
    }

    #[test]
    fn division_by_zero_is_bad_operand() {
        let ops = vec![OpsOperation::Value(V::Sint64(1)), OpsOperation::Value(V::Sint64(0)), OpsOperation::Div(
            OpId::new(SceneId(1), 0),
            OpId::new(SceneId(1), 1),
        )];
        assert!(matches!(eval(&ops, 2), Err(EvalError::DivisionByZero { .. })));
    }

    #[test]
    fn if_is_lazy_and_does_not_evaluate_other_branch() {
        // Other branch is a division by zero; if lazily skipped, no error.
        let ops = vec![
            OpsOperation::Value(V::Sint64(1)), // 0: cond = true
            OpsOperation::Value(V::Sint64(7)), // 1: then
            OpsOperation::Value(V::Sint64(0)), // 2: zero
            OpsOperation::Div(OpId::new(SceneId(1), 1), OpId::new(SceneId(1), 2)), // 3: else (div by zero)
            OpsOperation::If(OpId::new(SceneId(1), 0), OpId::new(SceneId(1), 1), OpId::new(SceneId(1), 3)), // 4
        ];
        assert_eq!(eval(&ops, 4).unwrap(), V::Sint64(7));
    }

    #[test]
    fn rect_arithmetic_is_an_error() {
        let ops = vec![
            OpsOperation::Value(V::Rect(boldui_protocol::Rect::new(0.0, 0.0, 1.0, 1.0))),
            OpsOperation::Value(V::Sint64(1)),
            OpsOperation::Add(OpId::new(SceneId(1), 0), OpId::new(SceneId(1), 1)),
        ];
        assert!(matches!(eval(&ops, 2), Err(EvalError::BadOperand { .. })));
    }

    #[test]
    fn point_scalar_broadcast() {
        let ops = vec![
            OpsOperation::Value(V::Point(boldui_protocol::Point::new(1.0, 2.0))),
            OpsOperation::Value(V::Sint64(10)),
            OpsOperation::Mul(OpId::new(SceneId(1), 0), OpId::new(SceneId(1), 1)),
        ];
        assert_eq!(eval(&ops, 2).unwrap(), V::Point(boldui_protocol::Point::new(10.0, 20.0)));
    }

    #[test]
    fn neq_and_eq_both_supported() {
        let ops = vec![OpsOperation::Value(V::Sint64(1)), OpsOperation::Value(V::Sint64(2)), OpsOperation::Neq(
            OpId::new(SceneId(1), 0),
            OpId::new(SceneId(1), 1),
        )];
        assert_eq!(eval(&ops, 2).unwrap(), V::Sint64(1));
    }

    #[test]
    fn memoisation_runs_each_index_once() {
        // Checks determinism across repeated evaluation passes over the
        // same ops rather than re-entrancy within a single pass.
        let ops = vec![
            OpsOperation::GetTime,
            OpsOperation::Add(OpId::new(SceneId(1), 0), OpId::new(SceneId(1), 0)),
        ];
        let a = eval(&ops, 1).unwrap();
        let b = eval(&ops, 1).unwrap();
        assert_eq!(a, b);
    }
}
