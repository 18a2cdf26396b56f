#![allow(dead_code)]

use async_trait::async_trait;
use client::{
    transport::{Transport, TransportError},
    wire::{Method, ServerCall},
    Page, Server,
};
use futures::channel::oneshot;
use serde_json::{json, Value};
use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
};

enum Reply {
    Json(Value),
    Fail(TransportError),
    Gated(oneshot::Receiver<()>, Value),
}

/// Answers server calls from per endpoint queues of canned replies and
/// records every call it sees. Calls without a queued reply fail.
#[derive(Default)]
pub struct StubTransport {
    replies: RefCell<HashMap<(&'static str, String), VecDeque<Reply>>>,
    calls: RefCell<Vec<ServerCall>>,
}

impl StubTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn reply(&self, method: Method, path: &str, body: Value) {
        self.push(method, path, Reply::Json(body));
    }

    pub fn fail(&self, method: Method, path: &str, error: TransportError) {
        self.push(method, path, Reply::Fail(error));
    }

    /// Queues a reply that is only delivered once the returned sender fires.
    pub fn reply_gated(&self, method: Method, path: &str, body: Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(method, path, Reply::Gated(rx, body));
        tx
    }

    pub fn calls(&self) -> Vec<ServerCall> {
        self.calls.borrow().clone()
    }

    pub fn pending(&self) -> usize {
        self.replies.borrow().values().map(VecDeque::len).sum()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.replies
            .borrow_mut()
            .entry((method.as_str(), path.to_string()))
            .or_default()
            .push_back(reply);
    }
}

#[async_trait(?Send)]
impl Transport for StubTransport {
    async fn call(&self, call: ServerCall) -> Result<Value, TransportError> {
        let endpoint = call.endpoint();
        let key = (endpoint.method.as_str(), endpoint.path.clone());
        self.calls.borrow_mut().push(call.clone());

        let reply = self
            .replies
            .borrow_mut()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(Reply::Json(body)) => Ok(body),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Gated(gate, body)) => {
                let _ = gate.await;
                Ok(body)
            }
            None => Err(TransportError::Other(format!("Unexpected request {}", call))),
        }
    }
}

pub fn server(stub: &Rc<StubTransport>) -> Server {
    Server::new(stub.clone())
}

/// A page that already merged `listing`.
pub async fn page_with(stub: &Rc<StubTransport>, listing: Value) -> Page {
    stub.reply(Method::Get, "/", listing);
    let page = server(stub).page("test/uri");
    page.comments().fetch().await.unwrap();
    page
}

pub fn ids(page: &Page) -> Vec<u64> {
    page.comments().map(|c| c.id().unwrap())
}

pub fn standard() -> Value {
    json!({
        "total_replies": 2,
        "hidden_replies": 0,
        "id": null,
        "replies": [
            {
                "id": 1,
                "parent": null,
                "text": "<p>Hello, World!</p>\n",
                "mode": 1,
                "hash": "4505c1eeda98",
                "author": "Peter Pan",
                "website": "peterpan.org",
                "created": 1387321261.572392,
                "modified": null,
                "likes": 3,
                "dislikes": 1,
                "total_replies": 1,
                "hidden_replies": 0,
                "replies": [
                    {
                        "id": 2,
                        "parent": 1,
                        "text": "<p>Response</p>\n",
                        "mode": 1,
                        "hash": "4509c1eeda98",
                        "author": "Max Müller",
                        "website": "max@müller.org",
                        "created": 1387321278.572392,
                        "modified": 1387321378.613392,
                        "likes": 0,
                        "dislikes": 1
                    }
                ]
            },
            {
                "id": 3,
                "parent": null,
                "text": "<p>Response</p>\n",
                "mode": 1,
                "hash": "4509c1eeda98",
                "author": "Max Müller",
                "website": "max@müller.org",
                "created": 1387321281.572392,
                "modified": null,
                "likes": 0,
                "dislikes": 1,
                "total_replies": 0,
                "hidden_replies": 0,
                "replies": []
            }
        ]
    })
}

pub fn deeply_nested() -> Value {
    json!({
        "total_replies": 3,
        "hidden_replies": 0,
        "id": null,
        "replies": [
            {
                "id": 1,
                "parent": null,
                "text": "<p>Hello, World!</p>\n",
                "mode": 1,
                "hash": "4505c1eeda98",
                "author": "Peter Pan",
                "website": "peter@pan.org",
                "created": 1387321261.572392,
                "modified": null,
                "likes": 3,
                "dislikes": 0,
                "total_replies": 1,
                "hidden_replies": 0,
                "replies": [
                    {
                        "id": 2,
                        "parent": 1,
                        "text": "<p>Response</p>\n",
                        "mode": 1,
                        "hash": "4509c1eeda98",
                        "author": "Max Müller",
                        "website": "max@müller.org",
                        "created": 138732125.572392,
                        "modified": null,
                        "total_replies": 2,
                        "hidden_replies": 0,
                        "replies": [
                            {
                                "id": 4,
                                "parent": 2,
                                "text": "<p>Nested Response</p>\n",
                                "mode": 1,
                                "hash": "4509c1ghda98",
                                "author": null,
                                "website": null,
                                "created": 138733125.572392,
                                "modified": null,
                                "total_replies": 1,
                                "hidden_replies": 0,
                                "replies": [
                                    {
                                        "id": 6,
                                        "parent": 4,
                                        "text": "<p>Deeply Nested Response</p>\n",
                                        "mode": 1,
                                        "hash": "4509c1abda98",
                                        "author": null,
                                        "website": null,
                                        "created": 138733525.572392,
                                        "modified": null,
                                        "total_replies": 1,
                                        "hidden_replies": 0,
                                        "likes": 0,
                                        "dislikes": 0
                                    }
                                ],
                                "likes": 0,
                                "dislikes": 0
                            },
                            {
                                "id": 5,
                                "parent": 2,
                                "text": "<p>Another Nested Response</p>\n",
                                "mode": 1,
                                "hash": "4509c1ghda98",
                                "author": null,
                                "website": null,
                                "created": 138733125.572392,
                                "modified": null,
                                "total_replies": 1,
                                "hidden_replies": 0,
                                "likes": 0,
                                "dislikes": 0
                            }
                        ],
                        "likes": 0,
                        "dislikes": 1
                    }
                ]
            },
            {
                "id": 3,
                "parent": null,
                "text": "<p>Response</p>\n",
                "mode": 1,
                "hash": "4509c1eeda98",
                "author": "Max Müller",
                "website": "max@müller.org",
                "created": 1387321291.572392,
                "modified": null,
                "likes": 0,
                "dislikes": 1,
                "total_replies": 0,
                "hidden_replies": 0,
                "replies": []
            },
            {
                "id": 7,
                "parent": null,
                "text": "<p>Yet another comments</p>\n",
                "mode": 1,
                "hash": "4509cuiaea98",
                "author": "Marina Müller",
                "website": "marina@müller.org",
                "created": 1387321391.572392,
                "modified": null,
                "likes": 5,
                "dislikes": 2,
                "total_replies": 0,
                "hidden_replies": 0,
                "replies": []
            }
        ]
    })
}

fn sortable(id: u64, created: f64, modified: Option<f64>, likes: u32, dislikes: u32) -> Value {
    json!({
        "id": id,
        "parent": null,
        "text": "<p>Yet another comments</p>\n",
        "mode": 1,
        "hash": "4509cuiaea98",
        "author": "Marina Müller",
        "website": "marina@müller.org",
        "created": created,
        "modified": modified,
        "likes": likes,
        "dislikes": dislikes,
        "total_replies": 0,
        "hidden_replies": 0,
        "replies": []
    })
}

pub fn for_sorting() -> Value {
    json!({
        "total_replies": 6,
        "hidden_replies": 0,
        "id": null,
        "replies": [
            sortable(1, 158732121.572392, Some(158732125.572392), 2, 0),
            sortable(2, 158732122.572392, None, 2, 9),
            sortable(3, 158732123.572392, Some(158732128.572392), 0, 4),
            sortable(4, 158732124.572392, Some(158732129.572392), 8, 2),
            sortable(5, 158732125.572392, None, 3, 0),
            sortable(6, 158732126.572392, None, 4, 2)
        ]
    })
}

/// A single comment record, as returned for creates, updates and fetches.
pub fn record(id: u64, mode: i64) -> Value {
    json!({
        "id": id,
        "parent": null,
        "text": "<p>Hey there!</p>\n",
        "mode": mode,
        "hash": "4505c1eeda98",
        "author": null,
        "website": null,
        "created": 1387321261.572392,
        "modified": null,
        "likes": 0,
        "dislikes": 0,
        "total_replies": 0,
        "hidden_replies": 0,
        "replies": []
    })
}
