pub mod binding;
pub mod catalog;
pub mod common;
pub mod context;
pub mod credentials;
pub mod instance;
pub mod operation;
pub mod plan;

pub use binding::*;
pub use catalog::*;
pub use common::*;
pub use context::*;
pub use credentials::*;
pub use instance::*;
pub use operation::*;
pub use plan::*;
