pub mod controller;
pub mod handle;
pub mod mpv;
pub mod playlist;
pub mod poll;
