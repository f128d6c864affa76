//! Typed housing tables: cleaning, encoding, splitting and alignment.
//!
//! Raw records enter as a [`RawTable`] whose cells may be absent. [`clean`]
//! imputes, ordinal-encodes and derives `TotalSF` to produce a fully numeric
//! [`FeatureTable`]. [`split()`] partitions it reproducibly, and [`align`]
//! reshapes inference inputs to a fitted model's [`Schema`].

mod align;
mod clean;
mod encoding;
mod error;
mod schema;
mod split;
mod study;
mod table;

pub use align::{FILL_VALUE, InputRecord, align};
pub use clean::{
    IMPUTATION_RULES, Imputation, REQUIRED_COLUMNS, TARGET, TOTAL_SF, TOTAL_SF_PARTS, clean,
    imputation_for,
};
pub use encoding::{
    BSMT_EXPOSURE, BSMT_FIN_TYPE1, ENCODINGS, GARAGE_FINISH, KITCHEN_QUAL, OrdinalEncoding,
    encoding_for,
};
pub use error::{ErrorKind, FrameError};
pub use schema::Schema;
pub use split::{DEFAULT_SEED, DEFAULT_TEST_FRACTION, Split, split, test_size};
pub use study::{Correlation, correlate_with_target, pearson};
pub use table::{FeatureTable, NA_TOKENS, RawTable, RawValue};
