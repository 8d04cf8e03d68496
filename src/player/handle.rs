// Capability interface of the external video player
// The controller drives any player through this fixed method set

use crate::error::PlaybackError;

pub trait PlaybackHandle {
    fn load_by_id(&mut self, video_id: &str) -> Result<(), PlaybackError>;
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self) -> Result<(), PlaybackError>;

    // Transport readings in seconds. May be NaN/infinite while the player
    // has nothing loaded; callers filter those out.
    fn current_time(&self) -> Result<f64, PlaybackError>;
    fn duration(&self) -> Result<f64, PlaybackError>;
}
