use std::io;

use uuid::Uuid;

/// Kind of the request
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum RequestKind {
    /// Retrieve the full event catalog
    ListEvents,

    /// Retrieve a single event by its id
    GetEvent,

    /// Submit a purchase for a number of tickets to an event
    ///
    /// The path argument is the event id; the body carries the ticket count.
    SubmitPurchase,

    /// Query the state of a previously submitted purchase
    QueryPurchase,

    /// Cancel a purchase that is still waiting in the queue
    CancelPurchase,

    /// Refund a set of previously issued tickets
    RefundTickets,
}

/// HTTP request method
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RequestMethod {
    /// GET request
    Get,
    /// POST request, may have a payload
    Post,
    /// DELETE request
    Delete,
}

/// Request sent from a client
///
/// Decoded from the wire by the HTTP shell and handed to the request handler.
pub struct Request {
    kind: RequestKind,
    client: Uuid,
    arg: Option<u64>,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("client", &self.client)
            .field("arg", &self.arg)
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// Interface for handling decoded requests
///
/// The front of the queueing system implements this trait. `handle` may be
/// called concurrently from different threads.
pub trait RequestHandler {
    /// Handle a decoded request
    fn handle(&self, request: Request);

    /// Shut the queueing system down, waiting for its worker to terminate
    fn shutdown(self);
}

/// A raw request, implemented by the HTTP server
pub trait RawRequest {
    /// Get the URL
    fn url(&self) -> &str;
    /// Get the request method
    fn method(&self) -> RequestMethod;

    /// Read the request body as bytes
    fn read_bytes(&mut self) -> io::Result<Vec<u8>>;
    /// Read the request body as string
    fn read_string(&mut self) -> io::Result<String>;

    /// Respond with a JSON body and the given status code
    fn respond_with_json(self: Box<Self>, body: String, status: u16, client: Uuid);
    /// Respond with a JSON body, status 201 and a `Location` header
    fn respond_with_created(self: Box<Self>, body: String, location: String, client: Uuid);
    /// Respond with a plain-text error message and the given status code
    fn respond_with_err(self: Box<Self>, err: String, status: u16, client: Uuid);
}

impl Request {
    /// Get the request's kind
    #[inline]
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Get the client's id
    ///
    /// If the client did not send the corresponding HTTP header, it is
    /// randomly generated.
    #[inline]
    pub fn client_id(&self) -> Uuid {
        self.client
    }

    /// Get the integer path argument, if the route carries one (an event id
    /// or purchase id depending on [`Self::kind()`])
    #[inline]
    pub fn arg(&self) -> Option<u64> {
        self.arg
    }

    /// Get the request URL
    #[inline]
    #[allow(unused)]
    pub fn url(&self) -> &str {
        self.raw.url()
    }

    /// Get the request method
    #[inline]
    #[allow(unused)]
    pub fn method(&self) -> RequestMethod {
        self.raw.method()
    }

    /// Read the payload provided by the client as bytes
    ///
    /// This method has side effects and should be called only once per
    /// request.
    #[inline]
    #[allow(unused)]
    pub fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        self.raw.read_bytes()
    }

    /// Read the payload provided by the client as a UTF-8 string
    ///
    /// Returns [`Err`] if the payload is invalid UTF-8 or in case of a
    /// communication error. Like [`Self::read_bytes()`], this method has side
    /// effects and should be called only once per request.
    #[inline]
    pub fn read_string(&mut self) -> io::Result<String> {
        self.raw.read_string()
    }

    /// Respond with a JSON body and the given status code.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_json(self, body: impl Into<String>, status: u16) {
        self.raw.respond_with_json(body.into(), status, self.client);
    }

    /// Respond with a JSON body, status 201 and a `Location` header.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_created(self, body: impl Into<String>, location: impl Into<String>) {
        self.raw
            .respond_with_created(body.into(), location.into(), self.client);
    }

    /// Respond with an error message and the given status code.
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_err(self, err: impl Into<String>, status: u16) {
        self.raw.respond_with_err(err.into(), status, self.client);
    }

    /// Create a new request from a [`RawRequest`]
    #[inline]
    pub fn from_raw(
        kind: RequestKind,
        client: Uuid,
        arg: Option<u64>,
        raw: Box<dyn RawRequest + Send>,
    ) -> Self {
        Self {
            kind,
            client,
            arg,
            raw,
        }
    }
}
