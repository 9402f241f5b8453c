//! Typed parameter extraction for http requests.
//!
//! This crate reads strings, integers, floats and json payloads out of an incoming
//! request. It sits on top of the request type of a host server and adds no routing
//! or transport of its own.
//!
//! # Features
//!
//! - one resolution order for scalar values: form body, url query, route parameters
//! - permissive number parsing that never fails the caller
//! - locale aware float parsing with a period or comma decimal separator
//! - streaming json decoding of the body, with optional close afterwards
//! - an injectable [`ParamLogger`] for the failures that are swallowed
//!
//! # Example
//!
//! ```
//! use http::header::CONTENT_TYPE;
//! use http::{Method, Request};
//! use micro_param::{ParamReader, ParamRequest, PathParams};
//!
//! let mut router = matchit::Router::new();
//! router.insert("/users/{id}", "user").unwrap();
//! let matched = router.at("/users/42").unwrap();
//!
//! let request = Request::builder()
//!     .method(Method::POST)
//!     .uri("/users/42?lang=en")
//!     .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
//!     .body("name=zava&balance=1%2C024.50")
//!     .unwrap();
//! let mut req = ParamRequest::from(request).with_path_params(PathParams::from(matched.params));
//!
//! let reader = ParamReader::new();
//! assert_eq!(reader.int(&mut req, "id"), 42);
//! assert_eq!(reader.string(&mut req, "name", 0), "zava");
//! assert_eq!(reader.string(&mut req, "lang", 0), "en");
//! assert_eq!(reader.float(&mut req, "balance", '.'), 1024.5);
//! ```

mod body;
mod error;
mod logger;
mod reader;
mod request;

pub use body::ReqBody;
pub use error::DecodeError;
pub use error::FormError;
pub use logger::ParamLogger;
pub use logger::TracingLogger;
pub use reader::DEFAULT_MAX_FORM_SIZE;
pub use reader::DecimalSeparator;
pub use reader::ParamReader;
pub use reader::ParamReaderBuilder;
pub use reader::ReaderConfig;
pub use reader::{decode_body, extract_float, extract_int, extract_string};
pub use request::ParamRequest;
pub use request::ParamSource;
pub use request::PathParams;
