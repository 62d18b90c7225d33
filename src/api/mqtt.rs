//! MQTT wiring (§6): an `EventSink` that publishes `StatusReport`/`FillRecord`/
//! `Event` JSON to the three topics named in `config::Mqtt`, plus a
//! connection-watcher thread that stamps `mqtt_connected`.
//!
//! Grounded on the teacher's `api/mqtt.rs` (`EspMqttClient::new` +
//! `mqtt_client.enqueue(topic, QoS, retain, payload)`), generalised from its
//! one hard-coded "test" topic/dummy payload into the three topics and three
//! payload kinds the abstract `ports::event_sink::EventSink` trait needs.

use crate::config::Mqtt as MqttConfig;
use crate::ports::event_sink::EventSink;
use crate::schemas::event::Event;
use crate::schemas::fill_record::FillRecord;
use crate::schemas::status::StatusReport;
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, MqttClientConfiguration, MqttProtocolVersion, QoS,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct MqttEventSink {
    client: EspMqttClient<'static>,
    topics: MqttConfig,
}

impl MqttEventSink {
    /// Connects and spawns the background thread that pumps `EspMqttConnection`
    /// (mandatory on this esp-idf-svc version: the client cannot progress
    /// without something draining its event loop) and flips `connected` on
    /// `Connected`/`Disconnected` notifications.
    pub fn connect(
        broker_url: &str,
        client_id: &str,
        topics: MqttConfig,
        connected: Arc<AtomicBool>,
    ) -> anyhow::Result<Self> {
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            protocol_version: Some(MqttProtocolVersion::V3_1_1),
            ..Default::default()
        };

        let (client, mut connection): (EspMqttClient<'static>, EspMqttConnection) =
            EspMqttClient::new(broker_url, &conf)?;

        std::thread::Builder::new()
            .name("MqttConn".to_string())
            .spawn(move || {
                while let Ok(event) = connection.next() {
                    use esp_idf_svc::mqtt::client::EventPayload::*;
                    match event.payload() {
                        Connected(_) => {
                            log::info!("mqtt: connected");
                            connected.store(true, Ordering::Relaxed);
                        }
                        Disconnected => {
                            log::warn!("mqtt: disconnected");
                            connected.store(false, Ordering::Relaxed);
                        }
                        Error(e) => log::warn!("mqtt: {:?}", e),
                        _ => {}
                    }
                }
            })
            .expect("failed to spawn MqttConn thread");

        Ok(MqttEventSink { client, topics })
    }

    fn publish(&mut self, topic: &str, qos: QoS, payload: &str) {
        if let Err(e) = self.client.enqueue(topic, qos, false, payload.as_bytes()) {
            log::warn!("mqtt: publish to {} failed: {:?}", topic, e);
        }
    }
}

impl EventSink for MqttEventSink {
    fn publish_status(&mut self, report: &StatusReport) {
        let topic = self.topics.status_topic.clone();
        self.publish(&topic, QoS::AtMostOnce, &report.to_json());
    }

    fn publish_fill(&mut self, record: &FillRecord) {
        let topic = self.topics.fills_topic.clone();
        self.publish(&topic, QoS::AtLeastOnce, &record.to_json());
    }

    fn publish_event(&mut self, event: &Event) {
        let topic = self.topics.events_topic.clone();
        self.publish(&topic, QoS::AtMostOnce, &event.to_json());
    }
}
