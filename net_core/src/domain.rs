use crate::dataset::TabularDataset;
use std::fmt;

/// The inferred domain of one input feature.
///
/// Continuous bounds are fixed at [0, 1]: features with fractional values
/// are assumed pre-normalized upstream, and the classifier does not widen
/// the bounds to the observed range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureDomain {
    Binary,
    Integer { lb: i64, ub: i64 },
    Continuous { lb: f64, ub: f64 },
}

impl FeatureDomain {
    /// Numeric bounds of the domain as a `(lb, ub)` pair.
    pub fn bounds(&self) -> (f64, f64) {
        match *self {
            FeatureDomain::Binary => (0.0, 1.0),
            FeatureDomain::Integer { lb, ub } => (lb as f64, ub as f64),
            FeatureDomain::Continuous { lb, ub } => (lb, ub),
        }
    }
}

/// Errors produced while inferring feature domains.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// The column holds no values, so no domain can be derived.
    EmptyColumn { name: String },

    /// The column contains values with no total order (NaN), so distinct
    /// counts and min/max are undefined.
    NonComparable { name: String },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::EmptyColumn { name } => write!(f, "column `{name}` is empty"),
            DomainError::NonComparable { name } => {
                write!(f, "column `{name}` contains non-comparable values")
            }
        }
    }
}

impl std::error::Error for DomainError {}

/// Derives one `FeatureDomain` per feature column, in column order.
///
/// Per column:
/// 1. exactly two distinct values -> `Binary` (the two values are not
///    otherwise inspected);
/// 2. else any genuinely fractional value -> `Continuous` over [0, 1];
/// 3. else `Integer` over [min, max] of the observed whole numbers. A
///    constant column lands here with lb = ub.
///
/// Pure function of the data: identical input yields identical output.
///
/// # Errors
/// `DomainError` if a column is empty or contains NaN.
pub fn infer_domains(dataset: &TabularDataset) -> Result<Vec<FeatureDomain>, DomainError> {
    dataset.features().map(classify_column).collect()
}

fn classify_column(column: &crate::dataset::Column) -> Result<FeatureDomain, DomainError> {
    let values = column.values();
    if values.is_empty() {
        return Err(DomainError::EmptyColumn {
            name: column.name().to_string(),
        });
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(DomainError::NonComparable {
            name: column.name().to_string(),
        });
    }

    let mut distinct: Vec<f64> = values.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    if distinct.len() == 2 {
        return Ok(FeatureDomain::Binary);
    }
    if distinct.iter().any(|v| v.trunc() != *v) {
        return Ok(FeatureDomain::Continuous { lb: 0.0, ub: 1.0 });
    }
    Ok(FeatureDomain::Integer {
        lb: distinct[0] as i64,
        ub: distinct[distinct.len() - 1] as i64,
    })
}
