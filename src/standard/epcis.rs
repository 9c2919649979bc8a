//! GS1 EPCIS 2.0 object event converter

use super::Payload;
use crate::error::InteropResult;

use chrono::Utc;
use serde_json::{json, Value};

/// GS1 company prefix used for SGTIN EPCs
pub const COMPANY_PREFIX: &str = "0614141";

const TIME_ZONE_OFFSET: &str = "+07:00";
const BIZ_STEP_COMMISSIONING: &str = "urn:epcglobal:cbv:bizstep:commissioning";
const DISPOSITION_ACTIVE: &str = "urn:epcglobal:cbv:disp:active";

/// Wrap a traceability payload in an EPCIS `ObjectEvent`.
///
/// `eventTime` comes from the payload's `event_time` or `timestamp` string
/// when present, otherwise the current time. The input is kept verbatim
/// under `tracepostExtension`.
pub fn to_epcis_event(payload: &Payload) -> InteropResult<Payload> {
    let event_time = ["event_time", "timestamp"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    let epc_list: Vec<Value> = match payload.get("batch_id").and_then(Value::as_str) {
        Some(batch_id) => vec![Value::from(format!(
            "urn:epc:id:sgtin:{}.{}",
            COMPANY_PREFIX, batch_id
        ))],
        None => Vec::new(),
    };

    let mut event = Payload::new();
    event.insert("type".into(), json!("ObjectEvent"));
    event.insert("eventTime".into(), json!(event_time));
    event.insert("eventTimeZoneOffset".into(), json!(TIME_ZONE_OFFSET));
    event.insert("epcList".into(), Value::Array(epc_list));
    event.insert("action".into(), json!("OBSERVE"));
    event.insert("bizStep".into(), json!(BIZ_STEP_COMMISSIONING));
    event.insert("disposition".into(), json!(DISPOSITION_ACTIVE));

    if let Some(location) = payload.get("location").and_then(Value::as_str) {
        event.insert(
            "readPoint".into(),
            json!({ "id": format!("urn:epc:id:sgln:{}", location) }),
        );
    }

    event.insert(
        "tracepostExtension".into(),
        Value::Object(payload.clone()),
    );

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_batch_event() {
        let input = payload(json!({ "batch_id": "B1", "location": "LOC1" }));
        let event = to_epcis_event(&input).unwrap();

        assert_eq!(event["type"], "ObjectEvent");
        assert_eq!(event["epcList"], json!(["urn:epc:id:sgtin:0614141.B1"]));
        assert_eq!(event["readPoint"]["id"], "urn:epc:id:sgln:LOC1");
        assert_eq!(event["action"], "OBSERVE");
        assert_eq!(event["eventTimeZoneOffset"], "+07:00");
        assert_eq!(event["tracepostExtension"], Value::Object(input));
    }

    #[test]
    fn test_non_string_batch_id_gives_empty_epc_list() {
        let event = to_epcis_event(&payload(json!({ "batch_id": 42 }))).unwrap();
        assert_eq!(event["epcList"], json!([]));
        assert!(!event.contains_key("readPoint"));
    }

    #[test]
    fn test_event_time_taken_from_payload() {
        let input = payload(json!({ "batch_id": "B7", "timestamp": "2024-03-01T08:00:00+07:00" }));
        let first = to_epcis_event(&input).unwrap();
        let second = to_epcis_event(&input).unwrap();

        assert_eq!(first["eventTime"], "2024-03-01T08:00:00+07:00");
        assert_eq!(first, second);
    }
}
