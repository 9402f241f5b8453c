//! The parameter reader.
//!
//! Scalar values are resolved from three channels, in order:
//!
//! 1. the parsed form (body values first, then query values merged in),
//! 2. the url query,
//! 3. the route-matched path parameters.
//!
//! An empty value counts as absent and falls through to the next channel. When the
//! form cannot be parsed the failure goes to the [`ParamLogger`] and the parameter is
//! absent. Malformed numbers read as zero, so a missing parameter and one explicitly
//! set to zero look the same to the caller.

use crate::error::DecodeError;
use crate::logger::{ParamLogger, TracingLogger};
use crate::request::ParamSource;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::num::IntErrorKind;

/// Default upper bound of an urlencoded form body, 10 MiB.
pub const DEFAULT_MAX_FORM_SIZE: usize = 10 << 20;

/// Settings of a [`ParamReader`].
///
/// Missing fields take their default when deserialized, so a host can embed this in
/// its own configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Largest form body, in bytes, read while parsing the form.
    pub max_form_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { max_form_size: DEFAULT_MAX_FORM_SIZE }
    }
}

/// Which character separates the integer and fractional digits of a number.
///
/// The other of the two characters is taken as the thousands separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalSeparator {
    /// `1,234.56`
    Period,
    /// `1.234,56`
    Comma,
}

impl DecimalSeparator {
    pub fn as_char(self) -> char {
        match self {
            DecimalSeparator::Period => '.',
            DecimalSeparator::Comma => ',',
        }
    }

    pub fn thousands_separator(self) -> char {
        match self {
            DecimalSeparator::Period => ',',
            DecimalSeparator::Comma => '.',
        }
    }
}

/// `','` selects [`DecimalSeparator::Comma`], any other character [`DecimalSeparator::Period`].
impl From<char> for DecimalSeparator {
    fn from(c: char) -> Self {
        if c == ',' { DecimalSeparator::Comma } else { DecimalSeparator::Period }
    }
}

/// Reads typed values out of a [`ParamSource`].
///
/// The reader holds no per-request state; one instance can serve every request of a
/// server.
///
/// # Example
/// ```
/// use http::Request;
/// use micro_param::{ParamReader, ParamRequest, PathParams};
///
/// let request = Request::builder().uri("/items/7?price=1.234,50").body(()).unwrap();
/// let mut req = ParamRequest::from(request).with_path_params(PathParams::from_iter([("id", "7")]));
///
/// let reader = ParamReader::new();
/// assert_eq!(reader.int(&mut req, "id"), 7);
/// assert_eq!(reader.float(&mut req, "price", ','), 1234.5);
/// assert_eq!(reader.string(&mut req, "missing", 0), "");
/// ```
#[derive(Debug, Clone)]
pub struct ParamReader<L = TracingLogger> {
    config: ReaderConfig,
    logger: L,
}

#[derive(Debug)]
pub struct ParamReaderBuilder<L> {
    config: ReaderConfig,
    logger: L,
}

impl ParamReader {
    /// A reader with the default config, logging through `tracing`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ParamReaderBuilder<TracingLogger> {
        ParamReaderBuilder { config: ReaderConfig::default(), logger: TracingLogger }
    }
}

impl Default for ParamReader {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> ParamReaderBuilder<L> {
    pub fn config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_form_size(mut self, max_form_size: usize) -> Self {
        self.config.max_form_size = max_form_size;
        self
    }

    pub fn logger<T: ParamLogger>(self, logger: T) -> ParamReaderBuilder<T> {
        ParamReaderBuilder { config: self.config, logger }
    }

    pub fn build(self) -> ParamReader<L> {
        ParamReader { config: self.config, logger: self.logger }
    }
}

impl<L: ParamLogger> ParamReader<L> {
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Reads `key` as a string, `""` when absent.
    ///
    /// With `max_length >= 1`, a value of at least `max_length` characters is cut to
    /// its first `max_length` **bytes**. The threshold counts characters while the cut
    /// counts bytes, so a cut inside a multi-byte character leaves a broken sequence,
    /// which shows up as U+FFFD. `max_length <= 0` disables truncation.
    pub fn string<R: ParamSource>(&self, req: &mut R, key: &str, max_length: i64) -> String {
        self.lookup(req, key).map(|value| truncate(value, max_length)).unwrap_or_default()
    }

    /// Reads `key` as a base 10 integer, `0` when absent or malformed.
    ///
    /// Out of range values saturate to `i64::MAX` / `i64::MIN`.
    pub fn int<R: ParamSource>(&self, req: &mut R, key: &str) -> i64 {
        self.lookup(req, key).map_or(0, |value| parse_int(&value))
    }

    /// Reads `key` as a float, `0.0` when absent or malformed.
    ///
    /// The thousands separator implied by `decimal_separator` is dropped before parsing.
    pub fn float<R: ParamSource>(&self, req: &mut R, key: &str, decimal_separator: impl Into<DecimalSeparator>) -> f64 {
        let separator = decimal_separator.into();
        self.lookup(req, key).map_or(0.0, |value| parse_float(&value, separator))
    }

    /// Decodes the first json value of the body into `target`.
    ///
    /// `target` is only written when decoding succeeds. See [`ParamReader::json`].
    pub fn decode_body<T, R>(&self, req: &mut R, target: &mut T, close_after: bool) -> Result<(), DecodeError>
    where
        T: DeserializeOwned,
        R: ParamSource,
    {
        *target = self.json(req, close_after)?;
        Ok(())
    }

    /// Decodes the first json value of the body, streaming straight from the body reader.
    ///
    /// Bytes after the first value are left unread. When `close_after` is set the body
    /// is closed whether decoding succeeded or not; a close failure is logged and never
    /// returned.
    pub fn json<T, R>(&self, req: &mut R, close_after: bool) -> Result<T, DecodeError>
    where
        T: DeserializeOwned,
        R: ParamSource,
    {
        let decoded = T::deserialize(&mut serde_json::Deserializer::from_reader(req.body()));

        if close_after {
            if let Err(e) = req.close_body() {
                self.logger.body_close_failed(req.uri(), &e);
            }
        }

        Ok(decoded?)
    }

    fn lookup<R: ParamSource>(&self, req: &mut R, key: &str) -> Option<String> {
        if let Err(e) = req.parse_form(self.config.max_form_size) {
            self.logger.form_parse_failed(req.uri(), &e);
            return None;
        }

        req.form_value(key)
            .filter(|value| !value.is_empty())
            .or_else(|| req.query_value(key).filter(|value| !value.is_empty()))
            .or_else(|| req.path_value(key).filter(|value| !value.is_empty()))
            .map(str::to_owned)
    }
}

fn truncate(value: String, max_length: i64) -> String {
    let Ok(max_length) = usize::try_from(max_length) else {
        return value;
    };

    if max_length == 0 || value.chars().count() < max_length {
        return value;
    }

    String::from_utf8_lossy(&value.as_bytes()[..max_length]).into_owned()
}

fn parse_int(value: &str) -> i64 {
    let parsed = match value.parse::<i64>() {
        Ok(i) => i,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => i64::MIN,
            _ => 0,
        },
    };

    if value.starts_with('-') && parsed > 0 { -parsed } else { parsed }
}

fn parse_float(value: &str, separator: DecimalSeparator) -> f64 {
    let thousands = separator.thousands_separator();
    let decimal = separator.as_char();

    let cleaned = value
        .chars()
        .filter(|c| *c != thousands)
        .map(|c| if c == decimal { '.' } else { c })
        .collect::<String>();

    cleaned.parse::<f64>().unwrap_or_default()
}

/// Reads `key` as a string with a default [`ParamReader`], see [`ParamReader::string`].
pub fn extract_string<R: ParamSource>(req: &mut R, key: &str, max_length: i64) -> String {
    ParamReader::new().string(req, key, max_length)
}

/// Reads `key` as an integer with a default [`ParamReader`], see [`ParamReader::int`].
pub fn extract_int<R: ParamSource>(req: &mut R, key: &str) -> i64 {
    ParamReader::new().int(req, key)
}

/// Reads `key` as a float with a default [`ParamReader`], see [`ParamReader::float`].
pub fn extract_float<R: ParamSource>(req: &mut R, key: &str, decimal_separator: impl Into<DecimalSeparator>) -> f64 {
    ParamReader::new().float(req, key, decimal_separator)
}

/// Decodes the json body into `target` with a default [`ParamReader`], see [`ParamReader::decode_body`].
pub fn decode_body<T, R>(req: &mut R, target: &mut T, close_after: bool) -> Result<(), DecodeError>
where
    T: DeserializeOwned,
    R: ParamSource,
{
    ParamReader::new().decode_body(req, target, close_after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::ReqBody;
    use crate::error::FormError;
    use crate::logger::MockParamLogger;
    use crate::request::{ParamRequest, PathParams};
    use http::header::CONTENT_TYPE;
    use http::{Method, Request};

    #[derive(Deserialize, Debug, Default, PartialEq)]
    struct Payload {
        a: i64,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn silent_reader() -> ParamReader<MockParamLogger> {
        ParamReader::builder().logger(MockParamLogger::new()).build()
    }

    fn get(uri: &str) -> ParamRequest {
        Request::builder().uri(uri).body(()).unwrap().into()
    }

    fn form_post(uri: &str, body: &'static str) -> ParamRequest {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
            .body(body)
            .unwrap()
            .into()
    }

    fn json_post(body: &'static str) -> ParamRequest {
        Request::builder()
            .method(Method::POST)
            .uri("/payload")
            .header(CONTENT_TYPE, mime::APPLICATION_JSON.essence_str())
            .body(body)
            .unwrap()
            .into()
    }

    fn path(pairs: &[(&str, &str)]) -> PathParams {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_absent_key() {
        let reader = silent_reader();
        let mut req = form_post("/?other=1", "another=2").with_path_params(path(&[("id", "3")]));

        assert_eq!(reader.string(&mut req, "name", 10), "");
        assert_eq!(reader.int(&mut req, "name"), 0);
        assert_eq!(reader.float(&mut req, "name", '.'), 0.0);
    }

    #[test]
    fn test_string_truncate() {
        let reader = silent_reader();
        let mut req = get("/?name=abcdef");

        assert_eq!(reader.string(&mut req, "name", 3), "abc");
        assert_eq!(reader.string(&mut req, "name", 6), "abcdef");
        assert_eq!(reader.string(&mut req, "name", 7), "abcdef");
        assert_eq!(reader.string(&mut req, "name", 1), "a");
    }

    #[test]
    fn test_string_truncate_disabled() {
        let reader = silent_reader();
        let mut req = get("/?name=abcdef");

        assert_eq!(reader.string(&mut req, "name", 0), "abcdef");
        assert_eq!(reader.string(&mut req, "name", -1), "abcdef");
        assert_eq!(reader.string(&mut req, "name", i64::MIN), "abcdef");
    }

    #[test]
    fn test_string_truncate_counts_chars_cuts_bytes() {
        assert_eq!(truncate("héllo".to_string(), 3), "h\u{e9}");
        assert_eq!(truncate("héllo".to_string(), 2), "h\u{FFFD}");
        // four chars but eight bytes: under the threshold, untouched
        assert_eq!(truncate("你好ab".to_string(), 5), "你好ab");
        assert_eq!(truncate("你好ab".to_string(), 4), "你\u{FFFD}");
    }

    #[test]
    fn test_int() {
        let reader = silent_reader();
        let mut req = get("/?neg=-42&pos=42&word=abc&plus=%2B7&float=1.5&space=%201&empty=");

        assert_eq!(reader.int(&mut req, "neg"), -42);
        assert_eq!(reader.int(&mut req, "pos"), 42);
        assert_eq!(reader.int(&mut req, "word"), 0);
        assert_eq!(reader.int(&mut req, "plus"), 7);
        assert_eq!(reader.int(&mut req, "float"), 0);
        assert_eq!(reader.int(&mut req, "space"), 0);
        assert_eq!(reader.int(&mut req, "empty"), 0);
    }

    #[test]
    fn test_parse_int_saturates() {
        assert_eq!(parse_int("9223372036854775807"), i64::MAX);
        assert_eq!(parse_int("9223372036854775808"), i64::MAX);
        assert_eq!(parse_int("-9223372036854775808"), i64::MIN);
        assert_eq!(parse_int("-99999999999999999999"), i64::MIN);
        assert_eq!(parse_int("-"), 0);
        assert_eq!(parse_int("-0"), 0);
    }

    #[test]
    fn test_float() {
        let reader = silent_reader();
        let mut req = get("/?us=1%2C234.56&eu=1.234%2C56&word=abc&exp=1e3&neg=-0%2C5");

        assert_eq!(reader.float(&mut req, "us", '.'), 1234.56);
        assert_eq!(reader.float(&mut req, "eu", ','), 1234.56);
        assert_eq!(reader.float(&mut req, "word", '.'), 0.0);
        assert_eq!(reader.float(&mut req, "exp", DecimalSeparator::Period), 1000.0);
        assert_eq!(reader.float(&mut req, "neg", DecimalSeparator::Comma), -0.5);
    }

    #[test]
    fn test_float_separator_mismatch() {
        // a comma decimal read with a period separator is dropped as a thousands mark
        assert_eq!(parse_float("1,5", DecimalSeparator::Period), 15.0);
        // two decimal marks do not parse
        assert_eq!(parse_float("1,5,6", DecimalSeparator::Comma), 0.0);
    }

    #[test]
    fn test_decimal_separator_from_char() {
        assert_eq!(DecimalSeparator::from(','), DecimalSeparator::Comma);
        assert_eq!(DecimalSeparator::from('.'), DecimalSeparator::Period);
        assert_eq!(DecimalSeparator::from(' '), DecimalSeparator::Period);
        assert_eq!(DecimalSeparator::Comma.thousands_separator(), '.');
    }

    #[test]
    fn test_form_wins_over_path() {
        let reader = silent_reader();
        let mut req = form_post("/users/path", "name=form").with_path_params(path(&[("name", "path")]));

        assert_eq!(reader.string(&mut req, "name", 0), "form");
    }

    #[test]
    fn test_query_wins_over_path() {
        let reader = silent_reader();
        let mut req = get("/users/7?id=8").with_path_params(path(&[("id", "7")]));

        assert_eq!(reader.int(&mut req, "id"), 8);
    }

    #[test]
    fn test_body_form_wins_over_query() {
        let reader = silent_reader();
        let mut req = form_post("/?name=query", "name=form");

        assert_eq!(reader.string(&mut req, "name", 0), "form");
    }

    #[test]
    fn test_empty_value_falls_through() {
        let reader = silent_reader();
        let mut req = form_post("/users/7?id=", "id=").with_path_params(path(&[("id", "7")]));

        assert_eq!(reader.int(&mut req, "id"), 7);
    }

    #[test]
    fn test_form_parse_failure_is_logged() {
        let mut logger = MockParamLogger::new();
        logger
            .expect_form_parse_failed()
            .withf(|uri, error| uri.path() == "/users/7" && matches!(error, FormError::InvalidEscape { .. }))
            .times(1)
            .return_const(());

        let reader = ParamReader::builder().logger(logger).build();
        let mut req = form_post("/users/7?id=8", "id=%zz").with_path_params(path(&[("id", "7")]));

        assert_eq!(reader.int(&mut req, "id"), 0);
    }

    #[test]
    fn test_too_large_form_is_logged() {
        let mut logger = MockParamLogger::new();
        logger
            .expect_form_parse_failed()
            .withf(|_, error| matches!(error, FormError::TooLargeBody { max_size: 8, .. }))
            .times(1)
            .return_const(());

        let reader = ParamReader::builder().max_form_size(8).logger(logger).build();
        let mut req = form_post("/", "name=abcdefgh");

        assert_eq!(reader.string(&mut req, "name", 0), "");
        assert_eq!(reader.config().max_form_size, 8);
    }

    #[test]
    fn test_decode_body() {
        let reader = silent_reader();
        let mut req = json_post("{\"a\":1}");
        let mut payload = Payload::default();

        reader.decode_body(&mut req, &mut payload, false).unwrap();

        assert_eq!(payload, Payload { a: 1, tags: vec![] });
        assert!(!req.req_body().is_closed());
    }

    #[test]
    fn test_decode_body_malformed() {
        let reader = silent_reader();
        let mut req = json_post("{\"a\":");
        let mut payload = Payload { a: 9, tags: vec!["keep".into()] };

        let err = reader.decode_body(&mut req, &mut payload, false).unwrap_err();

        assert!(err.is_eof());
        assert_eq!(payload, Payload { a: 9, tags: vec!["keep".into()] });
    }

    #[test]
    fn test_decode_body_type_mismatch() {
        let reader = silent_reader();
        let mut req = json_post("{\"a\":\"one\"}");

        let err = reader.json::<Payload, _>(&mut req, false).unwrap_err();
        assert!(!err.is_eof());
        assert!(err.to_string().starts_with("invalid json body"));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let reader = silent_reader();
        let mut req = json_post("{\"a\":2} {\"a\":3}");

        let payload: Payload = reader.json(&mut req, false).unwrap();
        assert_eq!(payload.a, 2);
    }

    #[test]
    fn test_decode_body_closes_on_success_and_failure() {
        let reader = silent_reader();

        let mut ok = json_post("{\"a\":1}");
        let mut payload = Payload::default();
        reader.decode_body(&mut ok, &mut payload, true).unwrap();
        assert!(ok.req_body().is_closed());

        let mut bad = json_post("{\"a\":");
        assert!(reader.decode_body(&mut bad, &mut payload, true).is_err());
        assert!(bad.req_body().is_closed());
        assert_eq!(payload.a, 1);
    }

    #[test]
    fn test_close_failure_is_logged() {
        let mut logger = MockParamLogger::new();
        logger
            .expect_body_close_failed()
            .withf(|uri, error| uri.path() == "/payload" && error.to_string() == "request body already closed")
            .times(1)
            .return_const(());

        let reader = ParamReader::builder().logger(logger).build();
        let mut req = json_post("{\"a\":1}");
        let mut payload = Payload::default();

        reader.decode_body(&mut req, &mut payload, true).unwrap();
        // the body is gone, reading fails but closing again must not surface
        assert!(reader.decode_body(&mut req, &mut payload, true).is_err());
        assert_eq!(payload.a, 1);
    }

    #[test]
    fn test_form_parse_keeps_json_body() {
        let reader = silent_reader();
        let mut req = json_post("{\"a\":5}").with_path_params(path(&[("id", "1")]));

        assert_eq!(reader.int(&mut req, "id"), 1);
        let payload: Payload = reader.json(&mut req, true).unwrap();
        assert_eq!(payload.a, 5);
    }

    #[test]
    fn test_free_functions() {
        let mut req = ParamRequest::new(
            Request::builder().uri("/items/7?name=widget&price=2.5").body(ReqBody::from("{\"a\":4}")).unwrap(),
            path(&[("id", "7")]),
        );

        assert_eq!(extract_string(&mut req, "name", 3), "wid");
        assert_eq!(extract_int(&mut req, "id"), 7);
        assert_eq!(extract_float(&mut req, "price", '.'), 2.5);

        let mut payload = Payload::default();
        decode_body(&mut req, &mut payload, true).unwrap();
        assert_eq!(payload.a, 4);
        assert!(req.req_body().is_closed());
    }

    #[test]
    fn test_reader_config() {
        let config: ReaderConfig = serde_json::from_str("{\"max_form_size\": 1024}").unwrap();
        assert_eq!(config.max_form_size, 1024);

        let config: ReaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReaderConfig::default());
        assert_eq!(config.max_form_size, DEFAULT_MAX_FORM_SIZE);

        let reader = ParamReader::builder().config(config.clone()).build();
        assert_eq!(reader.config(), &config);
    }
}
