//! The request front: decodes JSON bodies, drives the engine and the store,
//! encodes results

use box_office_core::{Request, RequestHandler, RequestKind};
use box_office_queue::{AdmissionError, Event, Position, QueueEngine, RefundError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

#[derive(Deserialize)]
struct SubmitBody {
    tickets: u32,
}

#[derive(Deserialize)]
struct RefundBody {
    #[serde(rename = "ticketIds")]
    ticket_ids: Vec<String>,
}

#[derive(Serialize)]
struct EventBody<'a> {
    id: u32,
    artist: &'a str,
    venue: &'a str,
    datetime: &'a str,
    remaining: u32,
}

impl<'a> From<&'a Event> for EventBody<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            id: event.id,
            artist: &event.artist,
            venue: &event.venue,
            datetime: &event.datetime,
            remaining: event.remaining,
        }
    }
}

/// The front of the queueing system, one per process
///
/// Owns the engine; the HTTP threads share it through [`RequestHandler`].
pub struct Front {
    engine: QueueEngine,
}

impl Front {
    /// Create a new [`Front`] around an engine
    pub fn new(engine: QueueEngine) -> Self {
        Self { engine }
    }

    fn list_events(&self, rq: Request) {
        let events = self.engine.store().events();
        let bodies: Vec<EventBody> = events.iter().map(EventBody::from).collect();
        let body = json!({ "events": bodies });
        rq.respond_with_json(body.to_string(), 200);
    }

    fn get_event(&self, rq: Request, id: u64) {
        match u32::try_from(id)
            .ok()
            .and_then(|id| self.engine.store().get_event(id))
        {
            Some(event) => {
                let body = serde_json::to_string(&EventBody::from(&event))
                    .unwrap_or_else(|_| "{}".into());
                rq.respond_with_json(body, 200);
            }
            None => rq.respond_with_err(format!("no event with id {id}"), 404),
        }
    }

    fn submit_purchase(&self, mut rq: Request, event_arg: u64) {
        let Ok(event_id) = u32::try_from(event_arg) else {
            rq.respond_with_err(format!("no event with id {event_arg}"), 404);
            return;
        };
        let body = match rq.read_string() {
            Ok(body) if !body.is_empty() => body,
            _ => {
                rq.respond_with_err("missing body", 400);
                return;
            }
        };
        let tickets = match serde_json::from_str::<SubmitBody>(&body) {
            Ok(submit) => submit.tickets,
            Err(err) => {
                rq.respond_with_err(format!("malformed body: {err}"), 400);
                return;
            }
        };

        match self.engine.submit(event_id, tickets) {
            Ok(id) => {
                debug!(purchase = id, event = event_id, tickets, "purchase submitted");
                rq.respond_with_created(
                    json!({ "purchaseId": id }).to_string(),
                    format!("/queue/{id}"),
                );
            }
            Err(err @ AdmissionError::QueueFull) => rq.respond_with_err(err.to_string(), 409),
            Err(err @ AdmissionError::InsufficientInventory { .. }) => {
                rq.respond_with_err(err.to_string(), 409)
            }
            Err(err @ AdmissionError::UnknownEvent(_)) => rq.respond_with_err(err.to_string(), 404),
            Err(err @ AdmissionError::InvalidTicketCount) => {
                rq.respond_with_err(err.to_string(), 400)
            }
        }
    }

    fn query_purchase(&self, rq: Request, id: u64) {
        match self.engine.position(id) {
            Position::QueueIndex(position) => {
                rq.respond_with_json(json!({ "state": "waiting", "position": position }).to_string(), 200)
            }
            Position::Completed(ticket_ids) => rq.respond_with_json(
                json!({ "state": "fulfilled", "ticketIds": ticket_ids }).to_string(),
                200,
            ),
            Position::Unknown => {
                rq.respond_with_json(json!({ "state": "unknown" }).to_string(), 404)
            }
        }
    }

    fn cancel_purchase(&self, rq: Request, id: u64) {
        if self.engine.remove(id) {
            rq.respond_with_json(json!({ "removed": true }).to_string(), 200);
        } else {
            rq.respond_with_json(json!({ "removed": false }).to_string(), 404);
        }
    }

    fn refund_tickets(&self, mut rq: Request) {
        let body = match rq.read_string() {
            Ok(body) if !body.is_empty() => body,
            _ => {
                rq.respond_with_err("missing body", 400);
                return;
            }
        };
        let refund = match serde_json::from_str::<RefundBody>(&body) {
            Ok(refund) => refund,
            Err(err) => {
                rq.respond_with_err(format!("malformed body: {err}"), 400);
                return;
            }
        };

        match self.engine.store().refund(&refund.ticket_ids) {
            Ok(count) => rq.respond_with_json(json!({ "refunded": count }).to_string(), 200),
            Err(err @ RefundError::UnknownTicketIds(_)) => {
                rq.respond_with_err(err.to_string(), 400)
            }
        }
    }
}

impl RequestHandler for Front {
    fn handle(&self, rq: Request) {
        match (*rq.kind(), rq.arg()) {
            (RequestKind::ListEvents, _) => self.list_events(rq),
            (RequestKind::GetEvent, Some(id)) => self.get_event(rq, id),
            (RequestKind::SubmitPurchase, Some(event)) => self.submit_purchase(rq, event),
            (RequestKind::QueryPurchase, Some(id)) => self.query_purchase(rq, id),
            (RequestKind::CancelPurchase, Some(id)) => self.cancel_purchase(rq, id),
            (RequestKind::RefundTickets, _) => self.refund_tickets(rq),
            // the router never produces these kinds without their argument
            _ => rq.respond_with_err("missing path argument", 400),
        }
    }

    fn shutdown(self) {
        self.engine.shutdown();
    }
}
