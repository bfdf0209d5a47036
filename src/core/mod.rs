pub mod error;

pub use error::{DescriptionError, Result};
