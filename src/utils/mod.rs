pub mod error;
pub mod logging;
pub mod string_utils;

pub use error::*;
pub use string_utils::{single_line, truncate_safe, truncate_with_suffix};
