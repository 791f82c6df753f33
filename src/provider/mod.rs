//! Provider REST plumbing: shared HTTP client, wire types and the playback API.

pub mod http;
pub mod model;
pub mod web_api;

pub use model::{
    Album, Artist, DeviceInfo, Image, PlayTarget, PlayerStatus, SdkPlaybackState, Track,
    TrackWindow,
};
pub use web_api::{PlayResponse, PlayerApi};
