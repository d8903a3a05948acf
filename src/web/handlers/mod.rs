pub mod analysis_handlers;
pub mod career_handlers;
pub mod interview_handlers;
pub mod system_handlers;

pub use analysis_handlers::*;
pub use career_handlers::*;
pub use interview_handlers::*;
pub use system_handlers::*;
