pub mod config;
pub mod forest;
pub mod project;
pub mod selection;
pub mod task;

pub use config::*;
pub use forest::*;
pub use project::*;
pub use selection::*;
pub use task::*;
