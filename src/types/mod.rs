pub mod analysis;
pub mod interview;
pub mod user;

pub use analysis::*;
pub use interview::*;
pub use user::*;
