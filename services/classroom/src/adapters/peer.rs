//! services/classroom/src/adapters/peer.rs
//!
//! The peer-connection transport: a local microphone track plus a data channel,
//! negotiated with the realtime service through an SDP offer/answer exchange.
//! The peer itself is provided by the platform through [`PeerFactory`].

use crate::adapters::sdp::SdpNegotiator;
use async_trait::async_trait;
use classroom_core::{
    domain::SessionCredential,
    ports::{
        InboundStream, LocalTrack, OutboundSink, PeerHandle, PortResult, RealtimeConnector,
        RealtimeLink,
    },
};
use tracing::{error, info};

/// Label of the data channel the realtime service listens on.
pub const EVENTS_CHANNEL: &str = "oai-events";

/// A platform peer connection, before and after negotiation.
#[async_trait]
pub trait PlatformPeer: Send {
    async fn add_track(&mut self, track: &mut dyn LocalTrack) -> PortResult<()>;

    async fn create_data_channel(&mut self, label: &str)
        -> PortResult<(OutboundSink, InboundStream)>;

    /// Creates an offer, applies it as the local description and returns its SDP.
    async fn create_offer(&mut self) -> PortResult<String>;

    async fn set_remote_answer(&mut self, sdp: String) -> PortResult<()>;

    async fn close(&mut self);
}

#[async_trait]
pub trait PeerFactory: Send + Sync {
    async fn create_peer(&self) -> PortResult<Box<dyn PlatformPeer>>;
}

struct PeerGuard(Box<dyn PlatformPeer>);

#[async_trait]
impl PeerHandle for PeerGuard {
    async fn close(&mut self) {
        self.0.close().await;
    }
}

pub struct PeerConnector<F> {
    factory: F,
    negotiator: SdpNegotiator,
}

impl<F: PeerFactory> PeerConnector<F> {
    pub fn new(factory: F, negotiator: SdpNegotiator) -> Self {
        Self {
            factory,
            negotiator,
        }
    }

    async fn negotiate(
        &self,
        peer: &mut dyn PlatformPeer,
        credential: &SessionCredential,
        model: &str,
        track: &mut dyn LocalTrack,
    ) -> PortResult<(OutboundSink, InboundStream)> {
        peer.add_track(track).await?;
        let channel = peer.create_data_channel(EVENTS_CHANNEL).await?;
        let offer = peer.create_offer().await?;
        let answer = self.negotiator.negotiate(&offer, model, credential).await?;
        peer.set_remote_answer(answer).await?;
        Ok(channel)
    }
}

#[async_trait]
impl<F: PeerFactory> RealtimeConnector for PeerConnector<F> {
    async fn connect(
        &self,
        credential: &SessionCredential,
        model: &str,
        track: &mut dyn LocalTrack,
    ) -> PortResult<RealtimeLink> {
        let mut peer = self.factory.create_peer().await?;
        match self
            .negotiate(peer.as_mut(), credential, model, track)
            .await
        {
            Ok((outbound, inbound)) => {
                info!("Peer connection negotiated for {}", model);
                Ok(RealtimeLink {
                    outbound,
                    inbound,
                    peer: Box::new(PeerGuard(peer)),
                })
            }
            Err(e) => {
                error!("Peer negotiation failed: {}", e);
                peer.close().await;
                Err(e)
            }
        }
    }
}
