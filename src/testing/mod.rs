// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Test-only utilities.

mod asserts;
mod dates;
mod test_dir;

pub use dates::*;
pub use test_dir::*;

pub use crate::{assert_err, assert_groups, assert_untouched, row, test_dir, test_path};

pub fn type_of<T>(_: T) -> &'static str {
  std::any::type_name::<T>()
}

/// Builds an `IndexRow` from JSON-style key / value pairs.
#[macro_export]
macro_rules! row {
  ($($key:literal: $value:tt),* $(,)?) => {
    serde_json::from_value::<$crate::prim::IndexRow>(
      serde_json::json!({
        $(
          $key: $value,
        )*
      })
    ).unwrap()
  }
}
