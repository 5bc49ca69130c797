use std::collections::hash_map::Entry;

use nalgebra::{DMatrix, RealField};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::control::evaluate::QuadraticValue;
use crate::control::problem::LqProblem;
use crate::control::value::solve_value_matrix;
use crate::error::LqResult;

/// Value matrices of one problem, memoised by the exact bits of K.
///
/// Gains whose entries have no exact `f64` image are solved every time and
/// never enter the map.
#[derive(Debug)]
pub struct ValueMatrixCache<'a, T: RealField> {
    problem: &'a LqProblem<T>,
    entries: FxHashMap<Vec<u64>, DMatrix<T>>,
    uncached: Option<DMatrix<T>>,
}

fn gain_key<T: RealField + Copy>(k: &DMatrix<T>) -> Option<Vec<u64>> {
    let mut key = Vec::with_capacity(k.len() + 1);
    key.push(k.nrows() as u64);
    for &v in k.iter() {
        let bits = nalgebra::try_convert::<T, f64>(v)?;
        if nalgebra::convert::<f64, T>(bits) != v {
            return None;
        }
        // -0.0 and 0.0 give the same P
        key.push(if bits == 0.0 { 0 } else { bits.to_bits() });
    }
    Some(key)
}

impl<'a, T: RealField + Copy> ValueMatrixCache<'a, T> {
    pub fn new(problem: &'a LqProblem<T>) -> ValueMatrixCache<'a, T> {
        ValueMatrixCache {
            problem,
            entries: FxHashMap::default(),
            uncached: None,
        }
    }

    pub fn problem(&self) -> &'a LqProblem<T> {
        self.problem
    }

    pub fn value_matrix(&mut self, k: &DMatrix<T>) -> LqResult<&DMatrix<T>> {
        self.problem.check_gain(k)?;
        let Some(key) = gain_key(k) else {
            debug!("gain has no exact f64 key, value matrix not cached");
            let p = solve_value_matrix(self.problem, k)?;
            return Ok(&*self.uncached.insert(p));
        };

        let cached = self.entries.len();
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                debug!(cached, "value matrix cache hit");
                Ok(&*entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let p = solve_value_matrix(self.problem, k)?;
                Ok(&*entry.insert(p))
            }
        }
    }

    pub fn value_function(&mut self, k: &DMatrix<T>) -> LqResult<QuadraticValue<'a, T>> {
        let p = self.value_matrix(k)?.clone();
        QuadraticValue::from_value_matrix(self.problem, p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.uncached = None;
    }
}
