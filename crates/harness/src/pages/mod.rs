//! Page objects for the site under test

pub mod home;

pub use home::{HomePage, MediaType};
