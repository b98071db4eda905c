pub mod expense;
pub mod profile;
pub mod summary;

pub use expense::*;
pub use profile::*;
pub use summary::*;
