//! Call/reply messages carried inside the secure channel (JSON)

use serde::{Deserialize, Serialize};

use clipr_core::{ClipError, ClipResult};

/// The closed set of remote procedures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Call {
    #[serde(rename = "Clipboard.Copy")]
    ClipboardCopy { text: String },
    #[serde(rename = "Clipboard.Paste")]
    ClipboardPaste,
    #[serde(rename = "URI.Open")]
    UriOpen { uri: String },
}

impl Call {
    pub fn method(&self) -> &'static str {
        match self {
            Call::ClipboardCopy { .. } => "Clipboard.Copy",
            Call::ClipboardPaste => "Clipboard.Paste",
            Call::UriOpen { .. } => "URI.Open",
        }
    }
}

/// Successful procedure result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Output {
    Unit,
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    Ok(Output),
    Err(String),
}

impl Reply {
    pub fn into_result(self) -> ClipResult<Output> {
        match self {
            Reply::Ok(out) => Ok(out),
            Reply::Err(msg) => Err(ClipError::Remote(msg)),
        }
    }
}

impl From<ClipResult<Output>> for Reply {
    fn from(result: ClipResult<Output>) -> Self {
        match result {
            Ok(out) => Reply::Ok(out),
            Err(e) => Reply::Err(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub seq: u64,
    pub call: Call,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub seq: u64,
    pub reply: Reply,
}

impl Request {
    pub fn encode(&self) -> ClipResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> ClipResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Response {
    pub fn encode(&self) -> ClipResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> ClipResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_wire_names() {
        let req = Request {
            seq: 3,
            call: Call::ClipboardCopy {
                text: "hi".into(),
            },
        };
        let json: serde_json::Value = serde_json::from_slice(&req.encode().unwrap()).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["call"]["method"], "Clipboard.Copy");
        assert_eq!(json["call"]["params"]["text"], "hi");
    }

    #[test]
    fn test_paste_has_no_params() {
        let req = Request::decode(br#"{"seq":1,"call":{"method":"Clipboard.Paste"}}"#).unwrap();
        assert_eq!(req.call, Call::ClipboardPaste);
        assert_eq!(req.call.method(), "Clipboard.Paste");
    }

    #[test]
    fn test_unknown_method_rejected() {
        assert!(Request::decode(br#"{"seq":1,"call":{"method":"Shell.Exec"}}"#).is_err());
    }

    #[test]
    fn test_reply_error_maps_to_remote() {
        let resp = Response::decode(br#"{"seq":9,"reply":{"err":"boom"}}"#).unwrap();
        assert!(matches!(resp.reply.into_result(), Err(ClipError::Remote(m)) if m == "boom"));
    }

    #[test]
    fn test_reply_from_result() {
        let reply = Reply::from(Err(ClipError::InvalidUri("ftp://x".into())));
        assert_eq!(reply, Reply::Err("invalid URI: ftp://x".into()));
        assert_eq!(
            Reply::from(Ok(Output::Text("t".into()))),
            Reply::Ok(Output::Text("t".into()))
        );
    }
}
