pub mod hashing;
pub mod money;
pub mod prompts;

pub use hashing::*;
pub use money::*;
pub use prompts::*;
