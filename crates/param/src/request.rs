//! Request abstraction consumed by the parameter reader.
//!
//! This module contains:
//! - `ParamSource`: the lookup channels a request must offer (form, query, path, body)
//! - `ParamRequest`: a `ParamSource` built on top of `http::Request`
//! - `PathParams`: route-matched values, usually produced by a `matchit` router

use crate::body::ReqBody;
use crate::error::FormError;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri};
use http_body::Body as HttpBody;
use matchit::Params;
use mime::Mime;
use std::io;
use std::io::Read;

/// The request surface the reader works against.
///
/// The reader only triggers form parsing, looks values up, reads the body and
/// asks for the body to be closed. Ownership of everything stays with the
/// implementor.
pub trait ParamSource {
    type Body: Read;

    /// The request target, used when reporting failures.
    fn uri(&self) -> &Uri;

    /// Parses the form once, later calls are no-ops returning `Ok`.
    ///
    /// A failure is only reported by the call that hit it; the form channel
    /// then stays empty. `max_size` bounds the number of body bytes read as
    /// form data.
    fn parse_form(&mut self, max_size: usize) -> Result<(), FormError>;

    /// First value of `key` in the parsed form, body values before query values.
    fn form_value(&self, key: &str) -> Option<&str>;

    /// First value of `key` in the url query.
    fn query_value(&self, key: &str) -> Option<&str>;

    /// Value of `key` matched by the router.
    fn path_value(&self, key: &str) -> Option<&str>;

    fn body(&mut self) -> &mut Self::Body;

    fn close_body(&mut self) -> io::Result<()>;
}

/// A request head with its in-memory body and route parameters.
#[derive(Debug)]
pub struct ParamRequest {
    head: Parts,
    body: ReqBody,
    path_params: PathParams,
    query: Vec<(String, String)>,
    form: FormState,
}

#[derive(Debug)]
enum FormState {
    Unparsed,
    Parsed(Vec<(String, String)>),
    Failed,
}

impl ParamRequest {
    pub fn new(request: Request<ReqBody>, path_params: PathParams) -> Self {
        let (head, body) = request.into_parts();
        Self::from_parts(head, body, path_params)
    }

    pub fn from_parts(head: Parts, body: ReqBody, path_params: PathParams) -> Self {
        let query = head.uri.query().map(parse_query).unwrap_or_default();
        Self { head, body, path_params, query, form: FormState::Unparsed }
    }

    /// Gathers the body of an async request before building the `ParamRequest`.
    pub async fn collect<B>(request: Request<B>, path_params: PathParams) -> Result<Self, B::Error>
    where
        B: HttpBody,
    {
        let (head, body) = request.into_parts();
        let body = ReqBody::collect(body).await?;
        Ok(Self::from_parts(head, body, path_params))
    }

    #[must_use]
    pub fn with_path_params(mut self, path_params: PathParams) -> Self {
        self.path_params = path_params;
        self
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    pub fn req_body(&self) -> &ReqBody {
        &self.body
    }

    fn read_form(&mut self, max_size: usize) -> Result<Vec<(String, String)>, FormError> {
        let mut pairs = if self.has_form_body()? { self.read_form_body(max_size)? } else { Vec::new() };

        let raw_query = self.head.uri.query().unwrap_or_default();
        check_escapes(raw_query.as_bytes())?;
        pairs.extend(serde_urlencoded::from_str::<Vec<(String, String)>>(raw_query)?);

        Ok(pairs)
    }

    /// Only `POST`, `PUT` and `PATCH` with an urlencoded content type carry form data.
    /// A missing content type is treated as `application/octet-stream`.
    fn has_form_body(&self) -> Result<bool, FormError> {
        if !matches!(self.head.method, Method::POST | Method::PUT | Method::PATCH) {
            return Ok(false);
        }

        let Some(value) = self.head.headers.get(CONTENT_TYPE) else {
            return Ok(false);
        };

        let content_type = value.to_str().map_err(FormError::invalid_content_type)?;
        let media_type = content_type.parse::<Mime>().map_err(FormError::invalid_content_type)?;

        Ok(media_type.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
    }

    fn read_form_body(&mut self, max_size: usize) -> Result<Vec<(String, String)>, FormError> {
        let current_size = self.body.remaining();
        if current_size > max_size {
            return Err(FormError::too_large_body(current_size, max_size));
        }

        let mut raw = Vec::with_capacity(current_size);
        self.body.read_to_end(&mut raw)?;

        check_escapes(&raw)?;
        Ok(serde_urlencoded::from_bytes::<Vec<(String, String)>>(&raw)?)
    }
}

impl<B> From<Request<B>> for ParamRequest
where
    B: Into<ReqBody>,
{
    fn from(request: Request<B>) -> Self {
        let (head, body) = request.into_parts();
        Self::from_parts(head, body.into(), PathParams::empty())
    }
}

impl ParamSource for ParamRequest {
    type Body = ReqBody;

    fn uri(&self) -> &Uri {
        &self.head.uri
    }

    fn parse_form(&mut self, max_size: usize) -> Result<(), FormError> {
        if !matches!(self.form, FormState::Unparsed) {
            return Ok(());
        }

        match self.read_form(max_size) {
            Ok(pairs) => {
                self.form = FormState::Parsed(pairs);
                Ok(())
            }
            Err(e) => {
                self.form = FormState::Failed;
                Err(e)
            }
        }
    }

    fn form_value(&self, key: &str) -> Option<&str> {
        match &self.form {
            FormState::Parsed(pairs) => first_value(pairs, key),
            FormState::Unparsed | FormState::Failed => None,
        }
    }

    fn query_value(&self, key: &str) -> Option<&str> {
        first_value(&self.query, key)
    }

    fn path_value(&self, key: &str) -> Option<&str> {
        self.path_params.get(key)
    }

    fn body(&mut self) -> &mut ReqBody {
        &mut self.body
    }

    fn close_body(&mut self) -> io::Result<()> {
        self.body.close()
    }
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Every `%` must start a two hex digit escape.
fn check_escapes(raw: &[u8]) -> Result<(), FormError> {
    for (i, _) in raw.iter().enumerate().filter(|(_, b)| **b == b'%') {
        let valid = raw.get(i + 1..i + 3).is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            let end = (i + 3).min(raw.len());
            return Err(FormError::invalid_escape(String::from_utf8_lossy(&raw[i..end])));
        }
    }
    Ok(())
}

/// Lenient query parsing: pairs with a broken escape are skipped, the rest are kept.
fn parse_query(raw: &str) -> Vec<(String, String)> {
    let valid = raw.split('&').filter(|pair| check_escapes(pair.as_bytes()).is_ok()).collect::<Vec<_>>().join("&");
    serde_urlencoded::from_str(&valid).unwrap_or_default()
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// Path parameters are named segments in the URL path that can be extracted and accessed
/// by name. For example, in the path "/users/{id}", "id" is a path parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { params: Vec::new() }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        first_value(&self.params, key.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'k, 'v> From<Params<'k, 'v>> for PathParams {
    fn from(params: Params<'k, 'v>) -> Self {
        params.iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for PathParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}
