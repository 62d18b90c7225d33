//! Abstract event sink (§6), modelling the three MQTT topics without a wire
//! transport: `.../status` (periodic), `.../fills` (one per completion,
//! QoS 1), `.../events` (operator-facing notices).

use crate::schemas::event::Event;
use crate::schemas::fill_record::FillRecord;
use crate::schemas::status::StatusReport;

pub trait EventSink {
    fn publish_status(&mut self, report: &StatusReport);
    fn publish_fill(&mut self, record: &FillRecord);
    fn publish_event(&mut self, event: &Event);
}

/// Routes through the process log, matching the teacher's event/logging
/// convention: the abstract sink and the serial console share one code path.
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn publish_status(&mut self, report: &StatusReport) {
        log::debug!("status: {}", report.to_json());
    }

    fn publish_fill(&mut self, record: &FillRecord) {
        log::info!("fill complete: {}", record.to_json());
    }

    fn publish_event(&mut self, event: &Event) {
        log::info!("event[{}] {}: {}", event.level, event.source, event.message);
    }
}
