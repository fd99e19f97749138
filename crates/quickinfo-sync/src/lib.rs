pub mod config;
pub mod controller;
pub mod credential;
pub mod opener;
pub mod surface;
pub mod terminal;

pub use controller::{CycleHandle, SyncController, SyncState, SyncTrigger};
pub use credential::CredentialLoader;
pub use surface::{PromptRequest, StatusSurface};
