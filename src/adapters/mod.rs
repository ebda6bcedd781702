// Adapters layer: concrete implementations of the domain ports for the local host.

pub mod http;
pub mod listeners;
pub mod process;
pub mod storage;
pub mod tools;

pub use http::HttpHealthProbe;
pub use listeners::SystemListenerTable;
pub use process::SystemCommandRunner;
pub use storage::LocalStorage;
pub use tools::PathToolLocator;
