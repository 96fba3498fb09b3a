//! Envelope and payload types exchanged with the companion process.
//!
//! Every message travels as an [`ApiMessage`]: a correlation id plus exactly
//! one [`Payload`]. The payload variant doubles as the discriminant, so an
//! envelope can never claim one message type while carrying another. On the
//! wire the envelope is a JSON object of the form
//! `{"messageId": 1, "messageType": "GetAllStepsRequest", "payload": {}}`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminant naming the kind of payload an envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Ask the companion to parse raw step text.
    GetStepValueRequest,
    /// Parsed step value, if the text matched a step.
    GetStepValueResponse,
    /// Ask for every step known to the companion.
    GetAllStepsRequest,
    /// Every known step, in companion order.
    GetAllStepsResponse,
    /// Ask for the parsed specifications.
    SpecsRequest,
    /// Parse details for each specification.
    SpecsResponse,
    /// The companion could not serve a request.
    ErrorResponse,
}

impl MessageType {
    /// Wire name of the discriminant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetStepValueRequest => "GetStepValueRequest",
            Self::GetStepValueResponse => "GetStepValueResponse",
            Self::GetAllStepsRequest => "GetAllStepsRequest",
            Self::GetAllStepsResponse => "GetAllStepsResponse",
            Self::SpecsRequest => "SpecsRequest",
            Self::SpecsResponse => "SpecsResponse",
            Self::ErrorResponse => "ErrorResponse",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged union of every request and response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "messageType", content = "payload")]
pub enum Payload {
    /// See [`StepValueRequest`].
    GetStepValueRequest(StepValueRequest),
    /// See [`StepValueResponse`].
    GetStepValueResponse(StepValueResponse),
    /// See [`AllStepsRequest`].
    GetAllStepsRequest(AllStepsRequest),
    /// See [`AllStepsResponse`].
    GetAllStepsResponse(AllStepsResponse),
    /// See [`SpecsRequest`].
    SpecsRequest(SpecsRequest),
    /// See [`SpecsResponse`].
    SpecsResponse(SpecsResponse),
    /// See [`ErrorResponse`].
    ErrorResponse(ErrorResponse),
}

impl Payload {
    /// The discriminant matching this payload.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::GetStepValueRequest(_) => MessageType::GetStepValueRequest,
            Self::GetStepValueResponse(_) => MessageType::GetStepValueResponse,
            Self::GetAllStepsRequest(_) => MessageType::GetAllStepsRequest,
            Self::GetAllStepsResponse(_) => MessageType::GetAllStepsResponse,
            Self::SpecsRequest(_) => MessageType::SpecsRequest,
            Self::SpecsResponse(_) => MessageType::SpecsResponse,
            Self::ErrorResponse(_) => MessageType::ErrorResponse,
        }
    }
}

/// A single envelope sent to or received from the companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMessage {
    /// Correlation id, see [`crate::client::generate_id`].
    pub message_id: i64,
    /// Body and discriminant.
    #[serde(flatten)]
    pub payload: Payload,
}

impl ApiMessage {
    /// Wrap a payload in an envelope.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepwire_client::messages::{AllStepsRequest, ApiMessage, MessageType};
    ///
    /// let message = ApiMessage::new(7, AllStepsRequest::default());
    /// assert_eq!(message.message_type(), MessageType::GetAllStepsRequest);
    /// ```
    #[must_use]
    pub fn new(message_id: i64, payload: impl Into<Payload>) -> Self {
        Self {
            message_id,
            payload: payload.into(),
        }
    }

    /// The discriminant of the carried payload.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }
}

/// Display value of a step together with its parameterised form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValue {
    /// Display text with every parameter rendered as `{}`.
    pub step_value: String,
    /// Text with parameters rendered by name, e.g. `Vowels in <word>`.
    #[serde(default)]
    pub parameterized_step_value: String,
    /// Parameter names in order of appearance.
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// Request to parse raw step text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValueRequest {
    /// Raw text as written in a spec file.
    pub step_text: String,
    /// Whether the step is followed by an inline table.
    #[serde(default)]
    pub has_inline_table: bool,
}

impl StepValueRequest {
    /// Request parsing of `step_text`.
    #[must_use]
    pub fn new(step_text: impl Into<String>) -> Self {
        Self {
            step_text: step_text.into(),
            has_inline_table: false,
        }
    }

    /// Mark the step as carrying an inline table.
    #[must_use]
    pub fn with_inline_table(mut self, has_inline_table: bool) -> Self {
        self.has_inline_table = has_inline_table;
        self
    }
}

/// Reply to [`StepValueRequest`]. `None` means no step matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValueResponse {
    /// Parsed value, absent when the text matched nothing.
    #[serde(default)]
    pub step_value: Option<StepValue>,
}

/// Request for every step the companion knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllStepsRequest {}

/// Reply to [`AllStepsRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllStepsResponse {
    /// Known steps in companion order.
    #[serde(default)]
    pub all_steps: Vec<StepValue>,
}

/// Request for the parsed specifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecsRequest {}

/// Reply to [`SpecsRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecsResponse {
    /// One entry per specification file.
    #[serde(default)]
    pub details: Vec<SpecDetail>,
}

/// Outcome of parsing one specification file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecDetail {
    /// The parsed spec, absent when the file failed to parse.
    #[serde(default)]
    pub spec: Option<Spec>,
    /// Problems found while parsing.
    #[serde(default)]
    pub parse_errors: Vec<ParseError>,
}

/// A parsed specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    /// Heading of the spec.
    pub spec_heading: String,
    /// Path of the file the spec was read from.
    #[serde(default)]
    pub file_name: String,
    /// Tags applied to the whole spec.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Scenarios in file order.
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// A scenario within a [`Spec`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Heading of the scenario.
    pub scenario_heading: String,
    /// Tags applied to the scenario.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A problem reported while parsing a spec file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseError {
    /// Human-readable description.
    pub message: String,
    /// One-based line number, zero when unknown.
    #[serde(default)]
    pub line_number: u32,
}

/// Reply sent by the companion when it cannot serve a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the failure.
    pub error: String,
}

/// A request body with exactly one paired response body.
pub trait Request: Into<Payload> {
    /// The response variant the companion answers with.
    type Response: Response;
}

/// A response body that can be unwrapped from a [`Payload`].
pub trait Response: Sized {
    /// Discriminant of this response.
    const MESSAGE_TYPE: MessageType;

    /// Extract this response from `payload`.
    ///
    /// # Errors
    ///
    /// Returns the payload unchanged when it carries a different variant.
    fn from_payload(payload: Payload) -> Result<Self, Payload>;
}

macro_rules! exchange {
    ($request:ident => $request_variant:ident, $response:ident => $response_variant:ident) => {
        impl From<$request> for Payload {
            fn from(request: $request) -> Self {
                Self::$request_variant(request)
            }
        }

        impl From<$response> for Payload {
            fn from(response: $response) -> Self {
                Self::$response_variant(response)
            }
        }

        impl Request for $request {
            type Response = $response;
        }

        impl Response for $response {
            const MESSAGE_TYPE: MessageType = MessageType::$response_variant;

            fn from_payload(payload: Payload) -> Result<Self, Payload> {
                match payload {
                    Payload::$response_variant(response) => Ok(response),
                    other => Err(other),
                }
            }
        }
    };
}

exchange!(StepValueRequest => GetStepValueRequest, StepValueResponse => GetStepValueResponse);
exchange!(AllStepsRequest => GetAllStepsRequest, AllStepsResponse => GetAllStepsResponse);
exchange!(SpecsRequest => SpecsRequest, SpecsResponse => SpecsResponse);

impl From<ErrorResponse> for Payload {
    fn from(response: ErrorResponse) -> Self {
        Self::ErrorResponse(response)
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_value_request_serialises_as_tagged_envelope() {
        let message = ApiMessage::new(42, StepValueRequest::new("Say \"hi\""));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "messageId": 42,
                "messageType": "GetStepValueRequest",
                "payload": { "stepText": "Say \"hi\"", "hasInlineTable": false }
            })
        );
    }

    #[test]
    fn parameterless_request_carries_empty_payload() {
        let message = ApiMessage::new(1, SpecsRequest::default());
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "messageId": 1, "messageType": "SpecsRequest", "payload": {} })
        );
    }

    #[test]
    fn decodes_step_value_response_without_value() {
        let message: ApiMessage = serde_json::from_value(json!({
            "messageId": 3,
            "messageType": "GetStepValueResponse",
            "payload": {}
        }))
        .unwrap();
        assert_eq!(
            message.payload,
            Payload::GetStepValueResponse(StepValueResponse { step_value: None })
        );
    }

    #[test]
    fn decodes_specs_response_with_mixed_details() {
        let message: ApiMessage = serde_json::from_value(json!({
            "messageId": 9,
            "messageType": "SpecsResponse",
            "payload": { "details": [
                { "spec": { "specHeading": "Vowels", "fileName": "specs/vowels.spec" } },
                { "parseErrors": [{ "message": "missing heading", "lineNumber": 1 }] }
            ]}
        }))
        .unwrap();
        let Payload::SpecsResponse(response) = message.payload else {
            panic!("expected specs response, got {:?}", message.payload);
        };
        assert_eq!(response.details.len(), 2);
        assert!(response.details.iter().any(|detail| detail.spec.is_none()));
    }

    #[test]
    fn rejects_mismatched_payload_for_discriminant() {
        let result = serde_json::from_value::<ApiMessage>(json!({
            "messageId": 1,
            "messageType": "GetAllStepsResponse",
            "payload": { "allSteps": "not a list" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn discriminant_matches_payload_variant() {
        let payload: Payload = ErrorResponse {
            error: "boom".into(),
        }
        .into();
        assert_eq!(payload.message_type(), MessageType::ErrorResponse);
        assert_eq!(payload.message_type().to_string(), "ErrorResponse");
    }

    #[test]
    fn response_unwraps_only_its_own_variant() {
        let payload = Payload::GetAllStepsResponse(AllStepsResponse::default());
        let Err(returned) = StepValueResponse::from_payload(payload.clone()) else {
            panic!("step value response must not accept all-steps payload");
        };
        assert_eq!(returned, payload);
        assert!(AllStepsResponse::from_payload(payload).is_ok());
    }
}
