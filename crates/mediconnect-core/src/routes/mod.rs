//! Navigation: route guards and declarative redirect commands.

pub mod guard;
pub mod navigation;

pub use guard::{resolve, Access, GuardDecision};
pub use navigation::{NavigationCommand, Navigator, LOGIN_PATH};
