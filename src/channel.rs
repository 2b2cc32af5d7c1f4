use std::sync::mpsc;

use tracing::{debug, info, warn};

use crate::controls::Confirmed;
use crate::protocol::{self, ClientEvent, ProtocolError};
use crate::state::Viewer;

/// Messages from the transport thread to the render loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Connected,
    Disconnected,
    Text(String),
}

/// Outbound emitters, one per user control. Fire-and-forget: a closed
/// transport only produces a warning.
#[derive(Clone)]
pub struct Outbound {
    tx: mpsc::Sender<ClientEvent>,
}

impl Outbound {
    pub fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self { tx }
    }

    pub fn toggle_pause(&self) {
        self.emit(ClientEvent::TogglePause);
    }

    pub fn set_speed(&self, speed: u32) {
        self.emit(ClientEvent::SetSpeed { speed });
    }

    /// Only callable with proof of an explicit user confirmation.
    pub fn restart_sim(&self, _confirmed: Confirmed) {
        self.emit(ClientEvent::RestartSim);
    }

    fn emit(&self, event: ClientEvent) {
        info!(?event, "emit");
        if self.tx.send(event).is_err() {
            warn!("transport closed; control event dropped");
        }
    }
}

/// Routes decoded server events into the viewer's transitions.
pub struct ChannelAdapter {
    outbound: Outbound,
}

impl ChannelAdapter {
    pub fn new(tx: mpsc::Sender<ClientEvent>) -> Self {
        Self { outbound: Outbound::new(tx) }
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    /// Apply one inbound message. Returns true if the frame needs redrawing.
    pub fn handle(&self, viewer: &mut Viewer, msg: Inbound) -> bool {
        match msg {
            Inbound::Connected => {
                info!("connected");
                viewer.set_connected(true);
                true
            }
            Inbound::Disconnected => {
                info!("disconnected");
                viewer.set_connected(false);
                true
            }
            Inbound::Text(text) => self.receive(viewer, &text).is_some(),
        }
    }

    /// Decode and apply a text frame. Malformed or unknown events are
    /// dropped; returns the applied event's name.
    pub fn receive(&self, viewer: &mut Viewer, text: &str) -> Option<&'static str> {
        match protocol::decode(text) {
            Ok(event) => {
                let name = event.name();
                debug!(event = name, "received");
                viewer.apply(event);
                Some(name)
            }
            Err(ProtocolError::UnknownEvent(name)) => {
                debug!(event = %name, "ignoring unknown event");
                None
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed event");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::{ParticleSystem, BURST_SIZE};

    fn setup() -> (ChannelAdapter, Viewer, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel();
        let viewer = Viewer::with_particles(100, ParticleSystem::with_seed(11));
        (ChannelAdapter::new(tx), viewer, rx)
    }

    const UPDATE: &str = r##"{"event":"update","data":{"alive":1,"steps":42,"cars":[
        {"id":0,"x":300,"y":150,"angle":0,"color":"#FF0055","alive":true,"crashed":false,"sensors":[[120,0.5]]},
        {"id":1,"x":500,"y":450,"angle":1.2,"color":"#00FFFF","alive":false,"crashed":true,"sensors":[]}
    ]}}"##;

    #[test]
    fn test_update_scenario() {
        let (ch, mut v, _rx) = setup();
        assert_eq!(ch.receive(&mut v, UPDATE), Some("update"));
        assert_eq!(v.render.cars.len(), 2);
        assert_eq!(v.render.alive_count, 1);
        assert_eq!(v.render.steps, Some(42));
        assert_eq!(v.particles.len(), BURST_SIZE);
        assert_eq!(v.trails.get(0).len(), 1);
        assert!(v.trails.get(1).is_empty());
    }

    #[test]
    fn test_reset_events() {
        let (ch, mut v, _rx) = setup();
        ch.receive(&mut v, UPDATE);
        ch.receive(&mut v, r#"{"event":"gen_log","data":{"generation":1,"distance":88.5,"epsilon":0.95}}"#);
        assert_eq!(ch.receive(&mut v, r#"{"event":"reset","data":{"generation":2}}"#), Some("reset"));
        assert_eq!(v.render.generation, 2);
        assert!(v.trails.get(0).is_empty());
        assert!(v.particles.is_empty());
        assert_eq!(v.telemetry.len(), 1, "soft reset keeps telemetry");

        ch.receive(&mut v, r#"{"event":"hard_reset","data":{"generation":1}}"#);
        assert!(v.telemetry.is_empty());
        assert!(v.telemetry.chart().is_empty());
    }

    #[test]
    fn test_pause_state() {
        let (ch, mut v, _rx) = setup();
        ch.receive(&mut v, r#"{"event":"pause_state","data":{"paused":true}}"#);
        assert!(v.render.paused);
    }

    #[test]
    fn test_malformed_and_unknown_dropped() {
        let (ch, mut v, _rx) = setup();
        ch.receive(&mut v, UPDATE);
        let before = v.render.clone();
        assert_eq!(ch.receive(&mut v, "not json"), None);
        assert_eq!(ch.receive(&mut v, r#"{"event":"update","data":{"cars":"nope"}}"#), None);
        assert_eq!(ch.receive(&mut v, r#"{"event":"leaderboard","data":{}}"#), None);
        assert_eq!(v.render, before);
    }

    #[test]
    fn test_connection_transitions() {
        let (ch, mut v, _rx) = setup();
        assert!(ch.handle(&mut v, Inbound::Connected));
        assert!(v.render.connected);
        assert!(ch.handle(&mut v, Inbound::Disconnected));
        assert!(!v.render.connected);
        assert!(!ch.handle(&mut v, Inbound::Text("garbage".into())));
        assert!(ch.handle(&mut v, Inbound::Text(UPDATE.into())));
    }

    #[test]
    fn test_outbound_emitters() {
        let (ch, _v, rx) = setup();
        ch.outbound().toggle_pause();
        ch.outbound().set_speed(3);
        let sent: Vec<_> = rx.try_iter().collect();
        assert_eq!(sent, vec![ClientEvent::TogglePause, ClientEvent::SetSpeed { speed: 3 }]);
    }

    #[test]
    fn test_emit_after_transport_closed_does_not_panic() {
        let (ch, _v, rx) = setup();
        drop(rx);
        ch.outbound().set_speed(2);
    }
}
