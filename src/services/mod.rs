pub mod ai_service;
pub mod insights_service;
pub mod refresh_queue;
pub mod report_service;
pub mod summary_service;

pub use ai_service::*;
pub use insights_service::*;
pub use refresh_queue::*;
pub use report_service::*;
pub use summary_service::*;
