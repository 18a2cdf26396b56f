use serde::Serialize;
use std::fmt;

use crate::protocol::CommentPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Like,
    Dislike,
}

/// Every request the client issues to the comment server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerCall {
    List {
        uri: String,
        parent: Option<u64>,
        /// `Some(0)` asks for counts only.
        limit: Option<u32>,
    },
    Fetch {
        id: u64,
    },
    Create {
        uri: String,
        payload: CommentPayload,
    },
    Update {
        id: u64,
        payload: CommentPayload,
    },
    Delete {
        id: u64,
    },
    Vote {
        id: u64,
        vote: Vote,
    },
    Count {
        uris: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Body<'a> {
    Comment(&'a CommentPayload),
    Uris(&'a [String]),
}

/// HTTP shape of a [`ServerCall`], relative to the server's base URL.
#[derive(Debug, Clone)]
pub struct Endpoint<'a> {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Body<'a>>,
}

impl ServerCall {
    pub fn endpoint(&self) -> Endpoint<'_> {
        match self {
            ServerCall::List { uri, parent, limit } => {
                let mut query = vec![("uri", uri.clone())];
                if let Some(parent) = parent {
                    query.push(("parent", parent.to_string()));
                }
                if let Some(limit) = limit {
                    query.push(("limit", limit.to_string()));
                }
                Endpoint {
                    method: Method::Get,
                    path: "/".into(),
                    query,
                    body: None,
                }
            }
            ServerCall::Fetch { id } => Endpoint {
                method: Method::Get,
                path: format!("/id/{}", id),
                query: vec![],
                body: None,
            },
            ServerCall::Create { uri, payload } => Endpoint {
                method: Method::Post,
                path: "/new".into(),
                query: vec![("uri", uri.clone())],
                body: Some(Body::Comment(payload)),
            },
            ServerCall::Update { id, payload } => Endpoint {
                method: Method::Put,
                path: format!("/id/{}", id),
                query: vec![],
                body: Some(Body::Comment(payload)),
            },
            ServerCall::Delete { id } => Endpoint {
                method: Method::Delete,
                path: format!("/id/{}", id),
                query: vec![],
                body: None,
            },
            ServerCall::Vote { id, vote } => Endpoint {
                method: Method::Post,
                path: match vote {
                    Vote::Like => format!("/id/{}/like", id),
                    Vote::Dislike => format!("/id/{}/dislike", id),
                },
                query: vec![],
                body: None,
            },
            ServerCall::Count { uris } => Endpoint {
                method: Method::Post,
                path: "/count".into(),
                query: vec![],
                body: Some(Body::Uris(uris)),
            },
        }
    }
}

impl fmt::Display for ServerCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endpoint = self.endpoint();
        write!(f, "{} {}", endpoint.method, endpoint.path)
    }
}
