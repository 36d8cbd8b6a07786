pub mod audio;
pub mod backend;
pub mod mpv;
pub mod peer;
pub mod sdp;
pub mod websocket;

pub use audio::{CommandMicrophone, CommandSpeaker};
pub use backend::HttpBackend;
pub use mpv::MpvPlayer;
pub use peer::{PeerConnector, PeerFactory, PlatformPeer};
pub use sdp::SdpNegotiator;
pub use websocket::WebSocketConnector;
