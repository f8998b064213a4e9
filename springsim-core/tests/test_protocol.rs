//! Wire encoding of init and data messages

use springsim_core::protocol::{round2, WireMessage};
use springsim_core::{encode, InitEvent, Limits, RunEvent, RunId, Sample, SimulationParameters};

#[test]
fn test_init_message_fields() {
    let event = RunEvent::Init(InitEvent {
        run: RunId(1),
        params: SimulationParameters::new(2.0, 50.0, 0.25, 1.5),
        limits: Limits::default(),
    });

    let json: serde_json::Value =
        serde_json::from_str(&encode(&event).expect("encode")).expect("valid json");
    assert_eq!(json["method"], "init");
    assert_eq!(json["mass"], 2.0);
    assert_eq!(json["spring_constant"], 50.0);
    assert_eq!(json["initial_displacement"], 0.25);
    assert_eq!(json["damping"], 1.5);
    assert_eq!(json["max_mass"], 10.0);
    assert_eq!(json["max_spring_constant"], 1000.0);
    assert_eq!(json["max_displacement"], 1.0);
}

#[test]
fn test_data_message_scales_and_rounds() {
    let event = RunEvent::Sample(Sample {
        run: RunId(3),
        time: 0.30000000000000004,
        displacement: 0.123456,
    });

    let json: serde_json::Value =
        serde_json::from_str(&encode(&event).expect("encode")).expect("valid json");
    assert_eq!(json["method"], "data");
    assert_eq!(json["time"], 0.3);
    assert_eq!(json["position"], 12.35);
    assert_eq!(json.as_object().map(|o| o.len()), Some(3));
}

#[test]
fn test_wire_message_parses_back() {
    let frame = r#"{"method":"data","time":1.2,"position":-3.5}"#;
    let message: WireMessage = serde_json::from_str(frame).expect("parse");
    assert_eq!(
        message,
        WireMessage::Data {
            time: 1.2,
            position: -3.5
        }
    );
}

#[test]
fn test_round2() {
    assert_eq!(round2(1.005_000_1), 1.01);
    assert_eq!(round2(-2.346), -2.35);
    assert_eq!(round2(0.004), 0.0);
    assert_eq!(round2(12.0), 12.0);
}
