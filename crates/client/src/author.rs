use std::{cell::RefCell, rc::Weak};

use crate::{
    comment::{Comment, CommentInner},
    event::Event,
};

#[derive(Debug, Default)]
pub struct AuthorEvents {
    pub ident_assigned: Event<String>,
    pub website_changed: Event<Option<String>>,
    pub name_changed: Event<Option<String>>,
}

#[derive(Debug, Default)]
struct AuthorState {
    ident: Option<String>,
    website: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

/// Who wrote a comment. Every comment owns exactly one.
///
/// Changing the name or website marks the owning comment as having unsent
/// changes.
pub struct Author {
    comment: Weak<CommentInner>,
    state: RefCell<AuthorState>,
    events: AuthorEvents,
}

impl Author {
    pub(crate) fn new(comment: Weak<CommentInner>) -> Self {
        Self {
            comment,
            state: RefCell::new(AuthorState::default()),
            events: AuthorEvents::default(),
        }
    }

    /// Opaque identifier derived by the server from email or IP.
    pub fn ident(&self) -> Option<String> {
        self.state.borrow().ident.clone()
    }

    /// Assigns the identifier. Once a non-empty one is set, later writes are
    /// ignored.
    pub fn set_ident(&self, ident: Option<String>) {
        let Some(ident) = ident.filter(|i| !i.is_empty()) else {
            return;
        };
        {
            let mut state = self.state.borrow_mut();
            if state.ident.as_deref().is_some_and(|i| !i.is_empty()) {
                return;
            }
            state.ident = Some(ident.clone());
        }
        self.events.ident_assigned.post(ident);
    }

    pub fn website(&self) -> Option<String> {
        self.state.borrow().website.clone()
    }

    pub fn set_website(&self, website: Option<String>) {
        {
            let mut state = self.state.borrow_mut();
            if state.website == website {
                return;
            }
            state.website = website.clone();
        }
        self.events.website_changed.post(website);
        self.touch_comment();
    }

    pub fn name(&self) -> Option<String> {
        self.state.borrow().name.clone()
    }

    pub fn set_name(&self, name: Option<String>) {
        {
            let mut state = self.state.borrow_mut();
            if state.name == name {
                return;
            }
            state.name = name.clone();
        }
        self.events.name_changed.post(name);
        self.touch_comment();
    }

    /// Sent with new comments, never received from the server.
    pub fn email(&self) -> Option<String> {
        self.state.borrow().email.clone()
    }

    pub fn set_email(&self, email: Option<String>) {
        self.state.borrow_mut().email = email;
    }

    pub fn events(&self) -> &AuthorEvents {
        &self.events
    }

    pub fn comment(&self) -> Option<Comment> {
        self.comment.upgrade().map(Comment::from_inner)
    }

    fn touch_comment(&self) {
        if let Some(comment) = self.comment() {
            comment.mark_dirty();
        }
    }
}

impl std::fmt::Debug for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Author")
            .field("ident", &state.ident)
            .field("name", &state.name)
            .field("website", &state.website)
            .finish()
    }
}
