// Core modules implementing table storage, encoding resolution, and error modeling.
pub mod append;
pub mod catalog;
pub mod encoding;
pub mod error;
pub mod project;
pub mod rows;
pub mod session;
