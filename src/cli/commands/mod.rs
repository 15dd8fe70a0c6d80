//! Commands plugged into the registry

pub mod completion;
pub mod configure;
pub mod logshuttle;
pub mod version;
pub mod whoami;
