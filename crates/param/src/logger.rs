//! Reporting of failures the reader swallows.
//!
//! Scalar extraction never returns an error and closing the body after a decode
//! never fails the decode. Those conditions are handed to a [`ParamLogger`]
//! instead, so a host (or a test) decides where they end up.

use crate::error::FormError;
use http::Uri;
use std::io;
use tracing::{error, warn};

#[cfg_attr(test, mockall::automock)]
pub trait ParamLogger {
    /// The form of the request at `uri` could not be parsed, the parameter is treated as absent.
    fn form_parse_failed(&self, uri: &Uri, error: &FormError);

    /// Closing the body of the request at `uri` failed after decoding.
    fn body_close_failed(&self, uri: &Uri, error: &io::Error);
}

/// The default logger, writes `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ParamLogger for TracingLogger {
    fn form_parse_failed(&self, uri: &Uri, error: &FormError) {
        warn!(uri = %uri, cause = %error, "parse form error");
    }

    fn body_close_failed(&self, uri: &Uri, error: &io::Error) {
        error!(uri = %uri, cause = %error, "close request body error");
    }
}
