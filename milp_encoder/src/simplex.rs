//! Reference LP backend: dense two-phase simplex with Bland's rule.
//!
//! Solves the continuous relaxation of the model — integrality is not
//! enforced and indicator constraints are rejected. That is exactly the
//! contract bound tightening needs: all tightening solves run over the LP
//! relaxation, and the indicator formulation never queries bounds.

use crate::backend::{Backend, BackendError};
use crate::model::{ConstraintModel, ObjSense, Sense};
use ndarray::Array2;

const EPS: f64 = 1e-9;

/// Pure-Rust simplex backend.
///
/// The iteration budget is shared across the two phases of a solve and
/// surfaces as [`BackendError::IterationLimit`] when exhausted, so a solve
/// can never block indefinitely.
#[derive(Debug, Clone)]
pub struct SimplexBackend {
    iteration_limit: usize,
}

impl Default for SimplexBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimplexBackend {
    pub fn new() -> Self {
        Self {
            iteration_limit: 100_000,
        }
    }

    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = limit;
        self
    }
}

/// How one model variable maps onto non-negative simplex columns.
#[derive(Debug, Clone, Copy)]
enum Mapping {
    /// `x = offset + sign * u`, `u >= 0`.
    Single { col: usize, offset: f64, sign: f64 },
    /// Free variable split: `x = u_pos - u_neg`.
    Split { pos: usize, neg: usize },
}

struct Row {
    coeffs: Vec<f64>,
    sense: Sense,
    rhs: f64,
}

enum Stop {
    Unbounded,
    Limit,
}

impl Backend for SimplexBackend {
    fn optimize(&self, model: &ConstraintModel) -> Result<f64, BackendError> {
        if model.num_indicators() > 0 {
            return Err(BackendError::Unsupported("indicator constraints"));
        }
        let objective = model.objective().ok_or(BackendError::MissingObjective)?;

        // Map variables onto non-negative columns.
        let mut mappings = Vec::with_capacity(model.num_vars());
        let mut ncols = 0usize;
        for (_, var) in model.vars() {
            let mapping = match (var.lb.is_finite(), var.ub.is_finite()) {
                (true, _) => {
                    let col = ncols;
                    ncols += 1;
                    Mapping::Single {
                        col,
                        offset: var.lb,
                        sign: 1.0,
                    }
                }
                (false, true) => {
                    let col = ncols;
                    ncols += 1;
                    Mapping::Single {
                        col,
                        offset: var.ub,
                        sign: -1.0,
                    }
                }
                (false, false) => {
                    let pos = ncols;
                    let neg = ncols + 1;
                    ncols += 2;
                    Mapping::Split { pos, neg }
                }
            };
            mappings.push(mapping);
        }

        // Constraint rows, rewritten over the shifted columns.
        let mut rows: Vec<Row> = Vec::new();
        for c in model.constraints() {
            let mut coeffs = vec![0.0; ncols];
            let mut rhs = c.rhs - c.expr.constant();
            for (v, coef) in c.expr.terms() {
                match mappings[v.index()] {
                    Mapping::Single { col, offset, sign } => {
                        coeffs[col] += coef * sign;
                        rhs -= coef * offset;
                    }
                    Mapping::Split { pos, neg } => {
                        coeffs[pos] += coef;
                        coeffs[neg] -= coef;
                    }
                }
            }
            rows.push(Row {
                coeffs,
                sense: c.sense,
                rhs,
            });
        }
        // Finite upper bounds of lower-shifted variables become explicit rows.
        for (id, var) in model.vars() {
            if let Mapping::Single { col, offset, sign } = mappings[id.index()] {
                if sign > 0.0 && var.ub.is_finite() {
                    let mut coeffs = vec![0.0; ncols];
                    coeffs[col] = 1.0;
                    rows.push(Row {
                        coeffs,
                        sense: Sense::Le,
                        rhs: var.ub - offset,
                    });
                }
            }
        }

        // Rows with no remaining variables are either trivially true or a
        // proof of infeasibility.
        let mut kept_rows = Vec::with_capacity(rows.len());
        for row in rows {
            if row.coeffs.iter().all(|c| c.abs() <= EPS) {
                if !row.sense.holds(0.0, row.rhs, EPS) {
                    return Err(BackendError::Infeasible);
                }
            } else {
                kept_rows.push(row);
            }
        }
        let mut rows = kept_rows;

        // Standard form: non-negative right-hand sides.
        for row in &mut rows {
            if row.rhs < 0.0 {
                for c in row.coeffs.iter_mut() {
                    *c = -*c;
                }
                row.rhs = -row.rhs;
                row.sense = match row.sense {
                    Sense::Le => Sense::Ge,
                    Sense::Ge => Sense::Le,
                    Sense::Eq => Sense::Eq,
                };
            }
        }

        let m = rows.len();
        let mut nslack = 0usize;
        let mut nart = 0usize;
        for row in &rows {
            match row.sense {
                Sense::Le => nslack += 1,
                Sense::Ge => {
                    nslack += 1;
                    nart += 1;
                }
                Sense::Eq => nart += 1,
            }
        }
        let art_start = ncols + nslack;
        let total = art_start + nart;
        let width = total + 1;

        let mut tab = Array2::<f64>::zeros((m, width));
        let mut basis = vec![0usize; m];
        let mut next_slack = ncols;
        let mut next_art = art_start;
        for (r, row) in rows.iter().enumerate() {
            for (c, coef) in row.coeffs.iter().enumerate() {
                tab[[r, c]] = *coef;
            }
            tab[[r, total]] = row.rhs;
            match row.sense {
                Sense::Le => {
                    tab[[r, next_slack]] = 1.0;
                    basis[r] = next_slack;
                    next_slack += 1;
                }
                Sense::Ge => {
                    tab[[r, next_slack]] = -1.0;
                    next_slack += 1;
                    tab[[r, next_art]] = 1.0;
                    basis[r] = next_art;
                    next_art += 1;
                }
                Sense::Eq => {
                    tab[[r, next_art]] = 1.0;
                    basis[r] = next_art;
                    next_art += 1;
                }
            }
        }

        let mut budget = self.iteration_limit;

        if nart > 0 {
            let mut costs = vec![0.0; total];
            for cost in costs.iter_mut().take(total).skip(art_start) {
                *cost = 1.0;
            }
            run_simplex(&mut tab, &mut basis, &costs, total, &mut budget).map_err(|stop| {
                match stop {
                    Stop::Unbounded => BackendError::Infeasible,
                    Stop::Limit => BackendError::IterationLimit {
                        limit: self.iteration_limit,
                    },
                }
            })?;
            let infeasibility: f64 = (0..tab.nrows())
                .map(|r| costs[basis[r]] * tab[[r, total]])
                .sum();
            if infeasibility > 1e-7 {
                return Err(BackendError::Infeasible);
            }

            // Drive leftover artificials out of the basis; a row that
            // cannot pivot is redundant and is dropped.
            let m1 = tab.nrows();
            let mut keep = vec![true; m1];
            for r in 0..m1 {
                if basis[r] >= art_start {
                    if let Some(c) = (0..art_start).find(|&c| tab[[r, c]].abs() > EPS) {
                        pivot(&mut tab, &mut basis, r, c, None);
                    } else {
                        keep[r] = false;
                    }
                }
            }
            if keep.iter().any(|k| !k) {
                let kept: Vec<usize> = (0..m1).filter(|&r| keep[r]).collect();
                let mut reduced = Array2::<f64>::zeros((kept.len(), width));
                for (nr, &r) in kept.iter().enumerate() {
                    reduced.row_mut(nr).assign(&tab.row(r));
                }
                basis = kept.iter().map(|&r| basis[r]).collect();
                tab = reduced;
            }
        }

        // Phase 2: the model objective over the shifted columns.
        let maximize = objective.sense == ObjSense::Maximize;
        let mut costs = vec![0.0; total];
        let mut fixed = objective.expr.constant();
        for (v, coef) in objective.expr.terms() {
            let internal = if maximize { -coef } else { coef };
            match mappings[v.index()] {
                Mapping::Single { col, offset, sign } => {
                    costs[col] += internal * sign;
                    fixed += coef * offset;
                }
                Mapping::Split { pos, neg } => {
                    costs[pos] += internal;
                    costs[neg] -= internal;
                }
            }
        }
        run_simplex(&mut tab, &mut basis, &costs, art_start, &mut budget).map_err(|stop| {
            match stop {
                Stop::Unbounded => BackendError::Unbounded,
                Stop::Limit => BackendError::IterationLimit {
                    limit: self.iteration_limit,
                },
            }
        })?;

        let rhs = tab.ncols() - 1;
        let value: f64 = (0..tab.nrows())
            .map(|r| costs[basis[r]] * tab[[r, rhs]])
            .sum();
        Ok(if maximize { fixed - value } else { fixed + value })
    }
}

/// Minimizes `costs` over the current tableau. Entering columns are
/// restricted to `0..allowed` (artificials are barred in phase 2). Bland's
/// rule on both the entering and leaving choice prevents cycling.
fn run_simplex(
    tab: &mut Array2<f64>,
    basis: &mut Vec<usize>,
    costs: &[f64],
    allowed: usize,
    budget: &mut usize,
) -> Result<(), Stop> {
    let m = tab.nrows();
    let width = tab.ncols();
    let rhs = width - 1;

    // Reduced-cost row, priced out for the current basis.
    let mut obj = vec![0.0; width];
    obj[..(width - 1)].copy_from_slice(&costs[..(width - 1)]);
    for r in 0..m {
        let cb = costs[basis[r]];
        if cb != 0.0 {
            for c in 0..width {
                obj[c] -= cb * tab[[r, c]];
            }
        }
    }

    loop {
        let entering = (0..allowed).find(|&c| obj[c] < -EPS);
        let Some(e) = entering else {
            return Ok(());
        };

        let mut leaving: Option<usize> = None;
        let mut best = f64::INFINITY;
        for r in 0..m {
            let a = tab[[r, e]];
            if a > EPS {
                let ratio = tab[[r, rhs]] / a;
                let better = match leaving {
                    None => true,
                    Some(lr) => {
                        ratio < best - 1e-12
                            || ((ratio - best).abs() <= 1e-12 && basis[r] < basis[lr])
                    }
                };
                if better {
                    leaving = Some(r);
                    best = ratio;
                }
            }
        }
        let Some(lr) = leaving else {
            return Err(Stop::Unbounded);
        };

        if *budget == 0 {
            return Err(Stop::Limit);
        }
        *budget -= 1;
        pivot(tab, basis, lr, e, Some(&mut obj));
    }
}

fn pivot(
    tab: &mut Array2<f64>,
    basis: &mut [usize],
    r: usize,
    e: usize,
    obj: Option<&mut Vec<f64>>,
) {
    let m = tab.nrows();
    let width = tab.ncols();
    let p = tab[[r, e]];
    for c in 0..width {
        tab[[r, c]] /= p;
    }
    for i in 0..m {
        if i == r {
            continue;
        }
        let f = tab[[i, e]];
        if f != 0.0 {
            for c in 0..width {
                tab[[i, c]] -= f * tab[[r, c]];
            }
            tab[[i, e]] = 0.0;
        }
    }
    if let Some(obj) = obj {
        let f = obj[e];
        if f != 0.0 {
            for c in 0..width {
                obj[c] -= f * tab[[r, c]];
            }
            obj[e] = 0.0;
        }
    }
    basis[r] = e;
}
