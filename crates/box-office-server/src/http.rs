//! HTTP request implementation
//!
//! Routes `tiny_http` requests into the transport-agnostic [`Request`] and
//! carries responses back, adding CORS headers and the `X-Client-Id` echo.

use std::io;
use std::io::Read;

use box_office_core::{RawRequest, Request, RequestKind, RequestMethod};
use tiny_http::{Header, Response};
use uuid::Uuid;

struct HttpRequest(tiny_http::Request);

impl RawRequest for HttpRequest {
    fn url(&self) -> &str {
        self.0.url()
    }

    fn method(&self) -> RequestMethod {
        match self.0.method() {
            tiny_http::Method::Get => RequestMethod::Get,
            tiny_http::Method::Post => RequestMethod::Post,
            tiny_http::Method::Delete => RequestMethod::Delete,
            _ => unreachable!(),
        }
    }

    fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.0.body_length().unwrap_or(0));
        self.0.as_reader().read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn read_string(&mut self) -> io::Result<String> {
        let mut s = String::with_capacity(self.0.body_length().unwrap_or(0));
        self.0.as_reader().read_to_string(&mut s)?;
        Ok(s)
    }

    fn respond_with_json(self: Box<Self>, body: String, status: u16, client: Uuid) {
        let res = Response::from_string(body)
            .with_status_code(status)
            .with_header(json_content_type());
        self.respond(res, client);
    }

    fn respond_with_created(self: Box<Self>, body: String, location: String, client: Uuid) {
        let res = Response::from_string(body)
            .with_status_code(201)
            .with_header(json_content_type())
            .with_header(Header::from_bytes(b"Location", location.into_bytes()).unwrap());
        self.respond(res, client);
    }

    fn respond_with_err(self: Box<Self>, err: String, status: u16, client: Uuid) {
        self.respond(Response::from_string(err).with_status_code(status), client);
    }
}

impl HttpRequest {
    /// Add HTTP headers (CORS, X-Client-Id) to `res` and send it
    fn respond<R: Read>(self, mut res: Response<R>, client: Uuid) {
        add_response_cors_headers(&mut res);

        let cid = client.hyphenated().to_string();
        res.add_header(Header::from_bytes(b"X-Client-Id", cid.into_bytes()).unwrap());

        self.0.respond(res).expect("HTTP response failed");
    }
}

fn json_content_type() -> Header {
    Header::from_bytes(b"Content-Type", b"application/json").unwrap()
}

/// Parse the given HTTP request
///
/// If [`None`] is returned, the request was already answered with a
/// corresponding error message.
pub fn parse(rq: tiny_http::Request) -> Option<Request> {
    use tiny_http::Method::*;

    let path = rq.url().split('?').next().unwrap_or("").to_owned();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let (kind, raw_arg) = match (rq.method(), segments.as_slice()) {
        (Options, _) => {
            let mut res = Response::empty(204);
            add_response_cors_headers(&mut res);
            rq.respond(res).expect("HTTP response failed");
            return None;
        }
        (Get, ["tickets"]) => (RequestKind::ListEvents, None),
        (Get, ["tickets", id]) => (RequestKind::GetEvent, Some(*id)),
        (Post, ["tickets", "refund"]) => (RequestKind::RefundTickets, None),
        (Post, ["queue", id]) => (RequestKind::SubmitPurchase, Some(*id)),
        (Get, ["queue", id]) => (RequestKind::QueryPurchase, Some(*id)),
        (Delete, ["queue", id]) => (RequestKind::CancelPurchase, Some(*id)),
        (Get, _) | (Post, _) | (Delete, _) => {
            let mut res = Response::from_string(
                "could not find the service you are looking for!

Valid requests are:
  GET    /tickets
  GET    /tickets/{eventId}
  POST   /tickets/refund
  POST   /queue/{eventId}
  GET    /queue/{purchaseId}
  DELETE /queue/{purchaseId}",
            )
            .with_status_code(404);
            add_response_cors_headers(&mut res);
            rq.respond(res).expect("HTTP response failed");
            return None;
        }
        _ => {
            let mut res = Response::empty(405);
            add_response_cors_headers(&mut res);
            rq.respond(res).expect("HTTP response failed");
            return None;
        }
    };

    let arg = match raw_arg {
        Some(segment) => match segment.parse::<u64>() {
            Ok(value) => Some(value),
            Err(_) => {
                let mut res = Response::from_string("path id must be a decimal integer")
                    .with_status_code(400);
                add_response_cors_headers(&mut res);
                rq.respond(res).expect("HTTP response failed");
                return None;
            }
        },
        None => None,
    };

    let mut cid = None;
    for hdr in rq.headers() {
        if hdr.field.equiv("x-client-id") {
            if let Ok(id) = Uuid::parse_str(hdr.value.as_str()) {
                cid = Some(id);
            }
        }
    }

    Some(Request::from_raw(
        kind,
        cid.unwrap_or_else(Uuid::new_v4),
        arg,
        Box::new(HttpRequest(rq)),
    ))
}

/// Add CORS headers to `res`
fn add_response_cors_headers<R: Read>(res: &mut Response<R>) {
    res.add_header(Header::from_bytes(b"Access-Control-Request-Method", b"*").unwrap());
    res.add_header(Header::from_bytes(b"Access-Control-Allow-Origin", b"*").unwrap());
    res.add_header(Header::from_bytes(b"Access-Control-Allow-Headers", b"*").unwrap());
    res.add_header(Header::from_bytes(b"Access-Control-Expose-Headers", b"*").unwrap());
}
