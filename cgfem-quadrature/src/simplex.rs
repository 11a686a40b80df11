//! Tabulated rules for the unit triangle with vertices `(0, 0)`, `(1, 0)` and `(0, 1)`.

use crate::{Error, Rule};

/// Returns a rule on the unit triangle that is exact for polynomials of the given total degree.
///
/// Orders 0 through 3 are available. The order 3 rule has a negative weight.
pub fn triangle(order: usize) -> Result<Rule<2>, Error> {
    let rule = match order {
        0 | 1 => (vec![0.5], vec![[1.0 / 3.0, 1.0 / 3.0]]),
        2 => (
            vec![1.0 / 6.0; 3],
            vec![[1.0 / 6.0, 1.0 / 6.0], [2.0 / 3.0, 1.0 / 6.0], [1.0 / 6.0, 2.0 / 3.0]],
        ),
        3 => (
            vec![-27.0 / 96.0, 25.0 / 96.0, 25.0 / 96.0, 25.0 / 96.0],
            vec![[1.0 / 3.0, 1.0 / 3.0], [0.2, 0.2], [0.6, 0.2], [0.2, 0.6]],
        ),
        _ => return Err(Error::NoRuleAvailable),
    };
    Ok(rule)
}
