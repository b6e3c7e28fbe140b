use serde_json::{json, Map, Value};

use crate::backend::unix_timestamp;

/// Status code every failure envelope carries.
pub const INVALID_COMMAND_CODE: u32 = 14;

/// Fixed request id echoed in array-status envelopes.
const REQUEST_ID: u32 = 1;

/// Which success shape a command renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStyle {
    /// `STATUS` array block, payload spliced flat into the top level.
    StatusArray,
    /// Single status string, payload placed under `Msg`.
    FlatMsg,
}

/// Status code, human message, and payload section of one command reply.
/// `msg` is only rendered by the array-status shape.
pub struct CommandReply {
    pub code: u32,
    pub msg: String,
    pub body: Map<String, Value>,
}

/// Wrap a handler reply in the dialect's success envelope.
pub fn success(style: EnvelopeStyle, description: &str, reply: CommandReply) -> Value {
    match style {
        EnvelopeStyle::StatusArray => {
            let mut root = Map::new();
            root.insert(
                String::from("STATUS"),
                json!([{
                    "Code": reply.code,
                    "Description": description,
                    "Msg": reply.msg,
                    "STATUS": "S",
                    "When": unix_timestamp(),
                }]),
            );
            for (key, value) in reply.body {
                root.insert(key, value);
            }
            root.insert(String::from("id"), json!(REQUEST_ID));
            Value::Object(root)
        }
        EnvelopeStyle::FlatMsg => json!({
            "STATUS": "S",
            "When": unix_timestamp(),
            "Code": reply.code,
            "Msg": Value::Object(reply.body),
            "Description": description,
        }),
    }
}

/// The failure envelope. Always the array-status shape and never encrypted,
/// whichever dialect produced it.
pub fn failure(description: &str, msg: &str) -> Value {
    json!({
        "STATUS": [{
            "Code": INVALID_COMMAND_CODE,
            "Description": description,
            "Msg": msg,
            "STATUS": "E",
            "When": unix_timestamp(),
        }],
        "id": REQUEST_ID,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply() -> CommandReply {
        let mut body = Map::new();
        body.insert(String::from("VERSION"), json!([{"API": "3.1"}]));
        CommandReply {
            code: 22,
            msg: String::from("CGMiner versions"),
            body,
        }
    }

    #[test]
    fn failure_envelope_is_code_14_error() {
        let envelope = failure("cgminer 1.0.0", "Invalid command");
        let status = &envelope["STATUS"][0];
        assert_eq!(status["Code"], 14);
        assert_eq!(status["STATUS"], "E");
        assert_eq!(status["Msg"], "Invalid command");
        assert_eq!(envelope["id"], 1);
    }

    #[test]
    fn status_array_splices_payload_at_top_level() {
        let envelope = success(EnvelopeStyle::StatusArray, "cgminer 1.0.0", reply());
        assert_eq!(envelope["STATUS"][0]["STATUS"], "S");
        assert_eq!(envelope["STATUS"][0]["Code"], 22);
        // the payload key lands beside STATUS, not nested under it
        assert_eq!(envelope["VERSION"][0]["API"], "3.1");
        assert_eq!(envelope["id"], 1);
    }

    #[test]
    fn flat_msg_nests_payload_under_msg() {
        let envelope = success(EnvelopeStyle::FlatMsg, "whatsminer v1.4", reply());
        assert_eq!(envelope["STATUS"], "S");
        assert_eq!(envelope["Msg"]["VERSION"][0]["API"], "3.1");
        assert_eq!(envelope["Code"], 22);
        assert!(envelope.get("id").is_none());
    }
}
