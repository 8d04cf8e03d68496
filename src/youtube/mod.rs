pub mod catalog;
pub mod credential;
