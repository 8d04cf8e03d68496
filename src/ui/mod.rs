pub mod app;
pub mod navigation;
pub mod views;
