// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Primitive types for index rows and Live Photo groups, and conversions for
//! the strings they carry.

mod conv;
mod live_photos;
mod row;

pub use conv::*;
pub use live_photos::*;
pub use row::*;
