//! The message exchange client.
//!
//! Every operation here performs at most one write-then-read round trip.
//! [`call`] is the single generic exchange; the domain calls on
//! [`StepClient`] and [`fetch_specs`] are thin wrappers choosing a request
//! variant and post-processing its paired response.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, trace, warn};

use crate::connection::{Connection, ConnectionConfig, TcpConnection};
use crate::error::ClientError;
use crate::messages::{
    AllStepsRequest, ApiMessage, ErrorResponse, Payload, Request, Response, Spec, SpecsRequest,
    StepValue, StepValueRequest,
};
use crate::resolver::ConnectionResolver;

/// Generate a correlation id for an outgoing envelope.
///
/// Returns wall-clock milliseconds since the Unix epoch. Consecutive calls
/// may return the same value; the id aids diagnostics only.
#[must_use]
pub fn generate_id() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

/// Send `request` over `connection` and unwrap its paired response.
///
/// # Errors
///
/// - [`ClientError::Connection`] if the round trip fails.
/// - [`ClientError::Companion`] if the companion answers with an error.
/// - [`ClientError::UnexpectedResponse`] for any other response variant.
pub fn call<Q, C>(connection: &mut C, request: Q) -> Result<Q::Response, ClientError>
where
    Q: Request,
    C: Connection + ?Sized,
{
    let expected = <Q::Response as Response>::MESSAGE_TYPE;
    let message = ApiMessage::new(generate_id(), request);
    debug!(
        message_id = message.message_id,
        message_type = %message.message_type(),
        "sending request"
    );

    let reply = connection.write_and_read(&message)?;
    trace!(
        message_id = reply.message_id,
        message_type = %reply.message_type(),
        "received reply"
    );

    match Q::Response::from_payload(reply.payload) {
        Ok(response) => Ok(response),
        Err(Payload::ErrorResponse(ErrorResponse { error })) => Err(ClientError::Companion(error)),
        Err(other) => Err(ClientError::UnexpectedResponse {
            expected,
            actual: other.message_type(),
        }),
    }
}

/// Outcome of a call that tolerates a companion that has not started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability<T> {
    /// The companion answered.
    Available(T),
    /// The companion could not be reached yet.
    Unavailable,
}

impl<T> Availability<T> {
    /// Transform the answered value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Availability<U> {
        match self {
            Self::Available(value) => Availability::Available(f(value)),
            Self::Unavailable => Availability::Unavailable,
        }
    }

    /// Whether the companion answered.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The answered value, or `T::default()` if the companion was unreachable.
    #[must_use]
    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        match self {
            Self::Available(value) => value,
            Self::Unavailable => T::default(),
        }
    }
}

/// Client for calls addressed by host context rather than by connection.
///
/// A connection-initialization failure, whether raised while resolving the
/// context or during the exchange itself, is reported as
/// [`Availability::Unavailable`] by the `try_*` calls and as an empty result
/// by the `fetch_*` calls. Every other failure propagates.
#[derive(Debug)]
pub struct StepClient<R> {
    resolver: R,
}

impl<R: ConnectionResolver> StepClient<R> {
    /// Create a client resolving connections through `resolver`.
    #[must_use]
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// The resolver backing this client.
    #[must_use]
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    fn exchange<Q: Request>(
        &self,
        context: &R::Context,
        request: Q,
    ) -> Result<Availability<Q::Response>, ClientError> {
        let outcome = self
            .resolver
            .resolve(context)
            .map_err(ClientError::from)
            .and_then(|mut connection| call(&mut connection, request));

        match outcome {
            Ok(response) => Ok(Availability::Available(response)),
            Err(err) if err.is_initialization() => {
                warn!(error = %err, "companion process not ready, returning empty result");
                Ok(Availability::Unavailable)
            }
            Err(err) => Err(err),
        }
    }

    pub(crate) fn request_step_value(
        &self,
        context: &R::Context,
        request: StepValueRequest,
    ) -> Result<Availability<Option<StepValue>>, ClientError> {
        Ok(self
            .exchange(context, request)?
            .map(|response| response.step_value))
    }

    /// Parse `step_text`, distinguishing an unreachable companion.
    ///
    /// # Errors
    ///
    /// Returns any [`ClientError`] other than a connection-initialization
    /// failure.
    pub fn try_step_value(
        &self,
        context: &R::Context,
        step_text: &str,
    ) -> Result<Availability<Option<StepValue>>, ClientError> {
        self.request_step_value(context, StepValueRequest::new(step_text))
    }

    /// Parse `step_text` into a step value.
    ///
    /// Returns `Ok(None)` both when no step matches and when the companion
    /// is not reachable yet.
    ///
    /// # Errors
    ///
    /// Returns any [`ClientError`] other than a connection-initialization
    /// failure.
    pub fn fetch_step_value(
        &self,
        context: &R::Context,
        step_text: &str,
    ) -> Result<Option<StepValue>, ClientError> {
        Ok(self.try_step_value(context, step_text)?.unwrap_or_default())
    }

    /// Display text of the step matching `input`, or the empty string.
    ///
    /// # Errors
    ///
    /// Returns any [`ClientError`] other than a connection-initialization
    /// failure.
    pub fn parsed_step_text(
        &self,
        context: &R::Context,
        input: &str,
    ) -> Result<String, ClientError> {
        Ok(self
            .fetch_step_value(context, input)?
            .map(|value| value.step_value)
            .unwrap_or_default())
    }

    /// Every step known to the companion, distinguishing an unreachable
    /// companion.
    ///
    /// # Errors
    ///
    /// Returns any [`ClientError`] other than a connection-initialization
    /// failure.
    pub fn try_all_steps(
        &self,
        context: &R::Context,
    ) -> Result<Availability<Vec<StepValue>>, ClientError> {
        Ok(self
            .exchange(context, AllStepsRequest::default())?
            .map(|response| response.all_steps))
    }

    /// Every step known to the companion, in the order received.
    ///
    /// Returns an empty list when the companion is not reachable yet.
    ///
    /// # Errors
    ///
    /// Returns any [`ClientError`] other than a connection-initialization
    /// failure.
    pub fn fetch_all_steps(&self, context: &R::Context) -> Result<Vec<StepValue>, ClientError> {
        Ok(self.try_all_steps(context)?.unwrap_or_default())
    }
}

/// Fetch the parsed specs over an established connection.
///
/// Details without a spec describe files that failed to parse and are
/// skipped. The remaining specs keep their relative order.
///
/// # Errors
///
/// Every failure propagates, including connection-initialization failures.
pub fn fetch_specs<C: Connection + ?Sized>(connection: &mut C) -> Result<Vec<Spec>, ClientError> {
    let response = call(connection, SpecsRequest::default())?;
    let total = response.details.len();
    let specs: Vec<Spec> = response
        .details
        .into_iter()
        .filter_map(|detail| detail.spec)
        .collect();
    if specs.len() < total {
        debug!(
            skipped = total.saturating_sub(specs.len()),
            "skipped spec details without a parsed spec"
        );
    }
    Ok(specs)
}

/// Connect to the companion on `port` and fetch its parsed specs.
///
/// # Errors
///
/// Returns [`ClientError::Connection`] wrapping an initialization failure if
/// nothing listens on `port`, plus everything [`fetch_specs`] returns.
pub fn fetch_specs_from_port(
    port: u16,
    config: &ConnectionConfig,
) -> Result<Vec<Spec>, ClientError> {
    let mut connection = TcpConnection::connect(port, config)?;
    fetch_specs(&mut connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;
    use crate::messages::{
        AllStepsResponse, MessageType, SpecDetail, SpecsResponse, StepValueResponse,
    };
    use crate::test_support::{ScriptedConnection, ScriptedResolver};
    use rstest::{fixture, rstest};
    use std::io;

    fn step(text: &str) -> StepValue {
        StepValue {
            step_value: text.to_owned(),
            ..StepValue::default()
        }
    }

    fn spec(heading: &str) -> Spec {
        Spec {
            spec_heading: heading.to_owned(),
            ..Spec::default()
        }
    }

    #[fixture]
    fn not_ready() -> StepClient<ScriptedResolver> {
        StepClient::new(ScriptedResolver::not_ready())
    }

    #[test]
    fn generated_ids_never_decrease() {
        let first = generate_id();
        let second = generate_id();
        assert!(second >= first);
        assert!(first > 0);
    }

    #[test]
    fn call_sends_request_and_unwraps_paired_response() {
        let mut connection = ScriptedConnection::new().reply(StepValueResponse {
            step_value: Some(step("Say {}")),
        });
        let log = connection.log();

        let Ok(response) = call(&mut connection, StepValueRequest::new("Say \"hi\"")) else {
            panic!("scripted exchange should succeed");
        };
        assert_eq!(response.step_value, Some(step("Say {}")));

        let sent = log.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent.first().map(ApiMessage::message_type),
            Some(MessageType::GetStepValueRequest)
        );
    }

    #[test]
    fn call_rejects_response_of_another_kind() {
        let mut connection = ScriptedConnection::new().reply(AllStepsResponse::default());
        let result = call(&mut connection, SpecsRequest::default());
        assert!(matches!(
            result,
            Err(ClientError::UnexpectedResponse {
                expected: MessageType::SpecsResponse,
                actual: MessageType::GetAllStepsResponse,
            })
        ));
    }

    #[test]
    fn call_surfaces_companion_error() {
        let mut connection = ScriptedConnection::new().reply(ErrorResponse {
            error: "project not loaded".into(),
        });
        let result = call(&mut connection, AllStepsRequest::default());
        assert!(matches!(result, Err(ClientError::Companion(ref msg)) if msg == "project not loaded"));
    }

    #[rstest]
    #[case("")]
    #[case("Say \"hi\"")]
    #[case("Given a table")]
    fn step_value_is_absent_without_companion(
        not_ready: StepClient<ScriptedResolver>,
        #[case] text: &str,
    ) {
        assert!(matches!(not_ready.fetch_step_value("shop", text), Ok(None)));
    }

    #[rstest]
    fn all_steps_are_empty_without_companion(not_ready: StepClient<ScriptedResolver>) {
        assert!(matches!(not_ready.fetch_all_steps("shop"), Ok(steps) if steps.is_empty()));
    }

    #[rstest]
    fn try_calls_report_unavailability(not_ready: StepClient<ScriptedResolver>) {
        assert!(matches!(
            not_ready.try_all_steps("shop"),
            Ok(Availability::Unavailable)
        ));
    }

    #[test]
    fn initialization_failure_during_exchange_degrades() {
        let connection = ScriptedConnection::new().fail(ConnectionError::Initialization {
            port: 1,
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        });
        let client = StepClient::new(ScriptedResolver::ready(connection));
        assert!(matches!(client.fetch_step_value("shop", "Say hi"), Ok(None)));
    }

    #[test]
    fn transport_failure_propagates() {
        let connection = ScriptedConnection::new().fail(ConnectionError::Closed);
        let client = StepClient::new(ScriptedResolver::ready(connection));
        assert!(matches!(
            client.fetch_all_steps("shop"),
            Err(ClientError::Connection(ConnectionError::Closed))
        ));
    }

    #[test]
    fn unmatched_step_is_absent_not_error() {
        let connection = ScriptedConnection::new().reply(StepValueResponse::default());
        let client = StepClient::new(ScriptedResolver::ready(connection));
        assert!(matches!(
            client.try_step_value("shop", "nothing like this"),
            Ok(Availability::Available(None))
        ));
    }

    #[test]
    fn all_steps_keep_companion_order() {
        let steps = vec![step("b"), step("a"), step("c")];
        let connection = ScriptedConnection::new().reply(AllStepsResponse {
            all_steps: steps.clone(),
        });
        let client = StepClient::new(ScriptedResolver::ready(connection));
        assert!(matches!(client.fetch_all_steps("shop"), Ok(received) if received == steps));
    }

    #[test]
    fn parsed_step_text_defaults_to_empty() {
        let connection = ScriptedConnection::new().reply(StepValueResponse::default());
        let client = StepClient::new(ScriptedResolver::ready(connection));
        assert!(matches!(client.parsed_step_text("shop", "x"), Ok(text) if text.is_empty()));
    }

    #[test]
    fn specs_skip_details_without_spec_in_order() {
        let details = vec![
            SpecDetail {
                spec: Some(spec("first")),
                parse_errors: Vec::new(),
            },
            SpecDetail::default(),
            SpecDetail {
                spec: Some(spec("second")),
                parse_errors: Vec::new(),
            },
            SpecDetail::default(),
            SpecDetail {
                spec: Some(spec("third")),
                parse_errors: Vec::new(),
            },
        ];
        let mut connection = ScriptedConnection::new().reply(SpecsResponse { details });

        let Ok(specs) = fetch_specs(&mut connection) else {
            panic!("scripted exchange should succeed");
        };
        let headings: Vec<&str> = specs.iter().map(|s| s.spec_heading.as_str()).collect();
        assert_eq!(headings, ["first", "second", "third"]);
    }

    #[test]
    fn specs_do_not_degrade_on_initialization_failure() {
        let mut connection = ScriptedConnection::new().fail(ConnectionError::NotRegistered(
            "shop".into(),
        ));
        let result = fetch_specs(&mut connection);
        assert!(matches!(result, Err(err) if err.is_initialization()));
    }

    #[test]
    fn availability_maps_and_defaults() {
        let available = Availability::Available(2).map(|n| n * 3);
        assert_eq!(available, Availability::Available(6));
        assert!(available.is_available());
        assert_eq!(Availability::<Vec<u8>>::Unavailable.unwrap_or_default(), Vec::<u8>::new());
    }
}
