use bytes::{Buf, Bytes};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use std::io;

/// A request body held in memory, readable once and closable.
///
/// Hosts running on an async server gather their body with [`ReqBody::collect`]
/// and hand it over together with the request head.
#[derive(Debug)]
pub struct ReqBody {
    inner: Kind,
}

#[derive(Debug)]
enum Kind {
    Open(Bytes),
    Closed,
}

impl ReqBody {
    pub fn empty() -> Self {
        Self { inner: Kind::Open(Bytes::new()) }
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { inner: Kind::Open(bytes) }
    }

    /// Collects every data frame of `body`, trailers are dropped.
    pub async fn collect<B>(body: B) -> Result<Self, B::Error>
    where
        B: HttpBody,
    {
        let collected = body.collect().await?;
        Ok(Self::once(collected.to_bytes()))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.inner, Kind::Closed)
    }

    /// Number of bytes not read yet, zero once closed.
    pub fn remaining(&self) -> usize {
        match &self.inner {
            Kind::Open(bytes) => bytes.len(),
            Kind::Closed => 0,
        }
    }

    /// Closes the body and releases the buffered bytes.
    ///
    /// Closing an already closed body is an error.
    pub fn close(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.inner, Kind::Closed) {
            Kind::Open(_) => Ok(()),
            Kind::Closed => Err(io::Error::other("request body already closed")),
        }
    }
}

impl Default for ReqBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl io::Read for ReqBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            Kind::Open(bytes) => {
                let n = buf.len().min(bytes.len());
                bytes.copy_to_slice(&mut buf[..n]);
                Ok(n)
            }
            Kind::Closed => Err(io::Error::other("read on closed request body")),
        }
    }
}

impl From<Bytes> for ReqBody {
    fn from(bytes: Bytes) -> Self {
        Self::once(bytes)
    }
}

impl From<Vec<u8>> for ReqBody {
    fn from(vec: Vec<u8>) -> Self {
        Self::once(Bytes::from(vec))
    }
}

impl From<String> for ReqBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<&'static str> for ReqBody {
    fn from(value: &'static str) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from_static(value.as_bytes())) }
    }
}

impl From<()> for ReqBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}
