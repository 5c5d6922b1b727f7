//! Operations on real numbers.
//!
//! - `arithmetic`: `+ - * /` and integer powers, via corner evaluation
//! - `limit`: the combinators every other operation is built from
//! - `compare`: injected comparators and sign tests
//! - `analysis`: roots, real powers, `exp`, `ln` and `log`
//! - `constants`: `e` and `π` as series
//! - `rounding`: rounding a real number to a number of digits

pub mod analysis;
pub mod arithmetic;
pub mod compare;
pub mod constants;
pub mod limit;
pub mod rounding;

pub use analysis::exp_rational;
pub use compare::{ApproximateComparator, RealComparator, StrictComparator};
pub use constants::{e, factorial, pi};
pub use limit::{limit, limit_monotonic, product, product_reals, sequence_limit, sum, sum_reals};
