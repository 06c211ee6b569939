pub mod close;
pub mod completion;
pub mod error;
pub mod id;
pub mod roles;
pub mod types;
pub mod uri;
