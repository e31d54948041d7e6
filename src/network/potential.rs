use crate::errors::NetworkError;
use ndarray::{ArrayD, IxDyn};

/// A non-negative table over a set of node ids.
///
/// Axis `i` of the table belongs to node `scope[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Potential {
    scope: Vec<usize>,
    table: ArrayD<f64>,
}

impl Potential {
    /// Potential of all ones over `scope` with the given cardinalities
    pub fn ones(scope: Vec<usize>, shape: &[usize]) -> Self {
        Potential {
            scope,
            table: ArrayD::ones(IxDyn(shape)),
        }
    }

    /// Build a potential from row-major values
    pub fn from_values(
        scope: Vec<usize>,
        shape: &[usize],
        values: Vec<f64>,
    ) -> Result<Self, NetworkError> {
        if scope.len() != shape.len() {
            return Err(NetworkError::Internal(format!(
                "scope of {} nodes with a {}-dimensional shape",
                scope.len(),
                shape.len()
            )));
        }
        let table = ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|e| NetworkError::Internal(format!("potential shape: {}", e)))?;
        Ok(Potential { scope, table })
    }

    pub fn scope(&self) -> &[usize] {
        &self.scope
    }

    pub fn table(&self) -> &ArrayD<f64> {
        &self.table
    }

    /// Values in row-major order
    pub fn values(&self) -> Vec<f64> {
        self.table.iter().copied().collect()
    }

    pub fn sum(&self) -> f64 {
        self.table.sum()
    }

    fn axes_of(&self, nodes: &[usize]) -> Result<Vec<usize>, NetworkError> {
        nodes
            .iter()
            .map(|n| {
                self.scope.iter().position(|s| s == n).ok_or_else(|| {
                    NetworkError::Internal(format!(
                        "node {} is not in potential scope {:?}",
                        n, self.scope
                    ))
                })
            })
            .collect()
    }

    /// Multiply `other` into this potential; `other`'s scope must be a subset of ours
    pub fn multiply_in(&mut self, other: &Potential) -> Result<(), NetworkError> {
        let axes = self.axes_of(&other.scope)?;
        let mut sub = vec![0; axes.len()];
        for (idx, v) in self.table.indexed_iter_mut() {
            for (k, &a) in axes.iter().enumerate() {
                sub[k] = idx[a];
            }
            *v *= other.table[IxDyn(&sub)];
        }
        Ok(())
    }

    /// Sum out every node not in `onto`; the result's axes follow `onto`'s order
    pub fn marginalize(&self, onto: &[usize]) -> Result<Potential, NetworkError> {
        let axes = self.axes_of(onto)?;
        let shape: Vec<usize> = axes.iter().map(|&a| self.table.shape()[a]).collect();
        let mut out = ArrayD::<f64>::zeros(IxDyn(&shape));
        let mut sub = vec![0; axes.len()];
        for (idx, v) in self.table.indexed_iter() {
            for (k, &a) in axes.iter().enumerate() {
                sub[k] = idx[a];
            }
            out[IxDyn(&sub)] += *v;
        }
        Ok(Potential {
            scope: onto.to_vec(),
            table: out,
        })
    }

    /// Multiply in the ratio `new / old`, treating 0/0 as 0.
    ///
    /// `new` and `old` must share the same scope, a subset of ours.
    pub fn absorb(&mut self, new: &Potential, old: &Potential) -> Result<(), NetworkError> {
        if new.scope != old.scope {
            return Err(NetworkError::Internal(format!(
                "absorb scopes differ: {:?} vs {:?}",
                new.scope, old.scope
            )));
        }
        let ratio = Potential {
            scope: new.scope.clone(),
            table: ndarray::Zip::from(&new.table)
                .and(&old.table)
                .map_collect(|&n, &o| if o == 0.0 { 0.0 } else { n / o }),
        };
        self.multiply_in(&ratio)
    }

    /// Scale so the entries sum to one
    pub fn normalized(&self) -> Result<Potential, NetworkError> {
        let total = self.sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(NetworkError::InconsistentEvidence);
        }
        Ok(Potential {
            scope: self.scope.clone(),
            table: self.table.mapv(|v| v / total),
        })
    }
}
