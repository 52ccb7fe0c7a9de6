//! The constraint model both encodings emit into: an additive, append-only
//! container for variables, linear constraints, indicator constraints and a
//! transient objective.

use crate::backend::BackendError;
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a variable owned by a [`ConstraintModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in the model's creation order. Assignments
    /// passed to [`ConstraintModel::satisfied`] are indexed by this.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Continuous,
    Integer,
    Binary,
}

/// What a variable stands for in the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRole {
    Input,
    PreActivation,
    PostActivation,
    Slack,
    Indicator,
    Decision,
    Output,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lb: f64,
    pub ub: f64,
    pub role: VarRole,
    /// (layer, neuron) coordinates; `None` only for inputs.
    pub coords: Option<(usize, usize)>,
}

/// Sparse linear expression: a sum of `coeff * var` terms plus a constant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_var(v: VarId, c: f64) -> Self {
        let mut e = Self::zero();
        e.add_term(v, c);
        e
    }

    pub fn add_term(&mut self, v: VarId, c: f64) {
        if c != 0.0 {
            let entry = self.terms.entry(v).or_insert(0.0);
            *entry += c;
            if entry.abs() <= 1e-12 {
                self.terms.remove(&v);
            }
        }
    }

    pub fn add_constant(&mut self, c: f64) {
        self.constant += c;
    }

    #[inline]
    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, *c))
    }

    pub fn scale(&self, k: f64) -> Self {
        let mut e = Self::zero();
        e.constant = self.constant * k;
        for (v, c) in self.terms.iter() {
            e.terms.insert(*v, c * k);
        }
        e
    }

    /// Value of the expression under a full assignment indexed by
    /// [`VarId::index`].
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|(v, c)| c * values[v.index()])
                .sum::<f64>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl Sense {
    pub(crate) fn holds(self, lhs: f64, rhs: f64, tol: f64) -> bool {
        match self {
            Sense::Le => lhs <= rhs + tol,
            Sense::Ge => lhs >= rhs - tol,
            Sense::Eq => (lhs - rhs).abs() <= tol,
        }
    }
}

/// A linear equality or inequality `expr (<=|>=|=) rhs`.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

/// An indicator constraint: `trigger = active_when  =>  expr (<=|>=|=) rhs`,
/// enforced exactly by a capable backend rather than via a Big-M constant.
#[derive(Debug, Clone)]
pub struct Indicator {
    pub name: String,
    pub trigger: VarId,
    pub active_when: bool,
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjSense {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone)]
pub struct Objective {
    pub expr: LinearExpr,
    pub sense: ObjSense,
}

/// The MILP under construction. Variables and constraints are only ever
/// appended; the objective is the one transient piece of state.
#[derive(Debug, Clone, Default)]
pub struct ConstraintModel {
    vars: Vec<Variable>,
    constraints: Vec<Constraint>,
    indicators: Vec<Indicator>,
    objective: Option<Objective>,
}

impl ConstraintModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variable and returns its handle.
    ///
    /// # Errors
    /// `BackendError::InvalidBounds` for a reversed interval.
    pub fn add_var(&mut self, var: Variable) -> Result<VarId, BackendError> {
        if var.lb > var.ub {
            return Err(BackendError::InvalidBounds {
                var: var.name,
                lb: var.lb,
                ub: var.ub,
            });
        }
        self.vars.push(var);
        Ok(VarId(self.vars.len() - 1))
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }

    pub fn vars(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.vars.iter().enumerate().map(|(i, v)| (VarId(i), v))
    }

    /// Replaces a variable's bounds (used by Big-M tightening).
    ///
    /// # Errors
    /// `BackendError::InvalidBounds` if `lb > ub`.
    pub fn set_bounds(&mut self, id: VarId, lb: f64, ub: f64) -> Result<(), BackendError> {
        if lb > ub {
            return Err(BackendError::InvalidBounds {
                var: self.vars[id.0].name.clone(),
                lb,
                ub,
            });
        }
        self.vars[id.0].lb = lb;
        self.vars[id.0].ub = ub;
        Ok(())
    }

    /// Replaces a variable's kind (used by the Big-M finalization casts).
    pub fn set_kind(&mut self, id: VarId, kind: VarKind) {
        self.vars[id.0].kind = kind;
    }

    pub fn add_constraint(&mut self, c: Constraint) {
        self.constraints.push(c);
    }

    pub fn add_indicator(&mut self, ind: Indicator) {
        self.indicators.push(ind);
    }

    #[inline]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[inline]
    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    #[inline]
    pub fn num_indicators(&self) -> usize {
        self.indicators.len()
    }

    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    pub fn clear_objective(&mut self) {
        self.objective = None;
    }

    #[inline]
    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Checks a full assignment (indexed by [`VarId::index`]) against
    /// variable bounds, integrality, and all linear and indicator
    /// constraints. An indicator fires when its trigger is within `tol`
    /// of the active value.
    pub fn satisfied(&self, values: &[f64], tol: f64) -> bool {
        if values.len() != self.vars.len() {
            return false;
        }
        for (i, var) in self.vars.iter().enumerate() {
            let v = values[i];
            if v < var.lb - tol || v > var.ub + tol {
                return false;
            }
            match var.kind {
                VarKind::Continuous => {}
                VarKind::Integer | VarKind::Binary => {
                    if (v - v.round()).abs() > tol {
                        return false;
                    }
                }
            }
        }
        for c in &self.constraints {
            if !c.sense.holds(c.expr.eval(values), c.rhs, tol) {
                return false;
            }
        }
        for ind in &self.indicators {
            let trigger = values[ind.trigger.index()];
            let fired = (trigger - if ind.active_when { 1.0 } else { 0.0 }).abs() <= tol;
            if fired && !ind.sense.holds(ind.expr.eval(values), ind.rhs, tol) {
                return false;
            }
        }
        true
    }

    /// Exports the model in CPLEX-LP format, including indicator rows
    /// (`trigger = v -> constraint`) and integrality sections, for external
    /// solving.
    pub fn to_lp_string(&self) -> String {
        let mut out = String::new();
        match self.objective.as_ref() {
            Some(obj) => {
                match obj.sense {
                    ObjSense::Minimize => out.push_str("Minimize\n obj: "),
                    ObjSense::Maximize => out.push_str("Maximize\n obj: "),
                }
                out.push_str(&self.fmt_expr(&obj.expr));
            }
            None => out.push_str("Minimize\n obj: 0"),
        }
        out.push('\n');

        out.push_str("Subject To\n");
        for c in &self.constraints {
            out.push_str(&format!(
                " {}: {} {} {}\n",
                c.name,
                self.fmt_expr(&c.expr),
                fmt_sense(c.sense),
                fmt_num(c.rhs - c.expr.constant())
            ));
        }
        for ind in &self.indicators {
            out.push_str(&format!(
                " {}: {} = {} -> {} {} {}\n",
                ind.name,
                self.vars[ind.trigger.0].name,
                if ind.active_when { 1 } else { 0 },
                self.fmt_expr(&ind.expr),
                fmt_sense(ind.sense),
                fmt_num(ind.rhs - ind.expr.constant())
            ));
        }

        out.push_str("Bounds\n");
        for var in &self.vars {
            match (var.lb.is_finite(), var.ub.is_finite()) {
                (true, true) => out.push_str(&format!(
                    " {} <= {} <= {}\n",
                    fmt_num(var.lb),
                    var.name,
                    fmt_num(var.ub)
                )),
                (true, false) => {
                    out.push_str(&format!(" {} >= {}\n", var.name, fmt_num(var.lb)))
                }
                (false, true) => {
                    out.push_str(&format!(" {} <= {}\n", var.name, fmt_num(var.ub)))
                }
                (false, false) => out.push_str(&format!(" {} free\n", var.name)),
            }
        }

        let generals: Vec<&str> = self
            .vars
            .iter()
            .filter(|v| v.kind == VarKind::Integer)
            .map(|v| v.name.as_str())
            .collect();
        if !generals.is_empty() {
            out.push_str("General\n");
            for name in generals {
                out.push_str(&format!(" {}\n", name));
            }
        }
        let binaries: Vec<&str> = self
            .vars
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .map(|v| v.name.as_str())
            .collect();
        if !binaries.is_empty() {
            out.push_str("Binary\n");
            for name in binaries {
                out.push_str(&format!(" {}\n", name));
            }
        }
        out.push_str("End\n");
        out
    }

    fn fmt_expr(&self, e: &LinearExpr) -> String {
        let mut parts: Vec<String> = Vec::new();
        for (v, c) in e.terms() {
            parts.push(format!("{} {}", fmt_coeff(c), self.vars[v.0].name));
        }
        if parts.is_empty() {
            parts.push("+0".to_string());
        }
        parts.join(" ")
    }
}

fn fmt_sense(s: Sense) -> &'static str {
    match s {
        Sense::Le => "<=",
        Sense::Ge => ">=",
        Sense::Eq => "=",
    }
}

fn fmt_num(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 {
        format!("{}", v.round() as i64)
    } else {
        format!("{v:.6}")
    }
}

fn fmt_coeff(c: f64) -> String {
    if (c - 1.0).abs() < 1e-12 {
        "+1".to_string()
    } else if (c + 1.0).abs() < 1e-12 {
        "-1".to_string()
    } else {
        format!("{c:+.6}")
    }
}

impl fmt::Display for ConstraintModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model({} vars, {} constraints, {} indicators)",
            self.num_vars(),
            self.num_constraints(),
            self.num_indicators()
        )
    }
}
