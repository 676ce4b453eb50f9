use crate::logger::log;
use serde::Serialize;

/// The two sides of a two-party negotiation. The initiator sends the first
/// offer; the role is assigned by the signaling server's join acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Initiator,
    Responder,
}

/// One joined room.
///
/// Created on join, destroyed on leave. Owns nothing asynchronous itself;
/// the negotiation handler mutates it as signaling events arrive.
#[derive(Debug)]
pub struct Session {
    room: String,
    role: Option<Role>,
    peer_count: u32,
    caption: Option<String>,
}

impl Session {
    pub fn new(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            role: None,
            peer_count: 0,
            caption: None,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_initiator(&self) -> bool {
        self.role == Some(Role::Initiator)
    }

    /// Assigns the role decided by the join acknowledgment. The role is
    /// immutable for the session's lifetime; a conflicting re-assignment is
    /// logged and ignored.
    pub fn assign_role(&mut self, role: Role) {
        match self.role {
            None => self.role = Some(role),
            Some(current) if current == role => {}
            Some(current) => log(&format!(
                "Ignoring role re-assignment {:?} -> {:?} for room {}",
                current, role, self.room
            )),
        }
    }

    pub fn peer_count(&self) -> u32 {
        self.peer_count
    }

    pub fn set_peer_count(&mut self, count: u32) {
        self.peer_count = count;
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn set_caption(&mut self, sentence: Option<String>) {
        self.caption = sentence.filter(|s| !s.is_empty());
    }

    pub fn clear_caption(&mut self) {
        self.caption = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_is_set_once() {
        let mut s = Session::new("demo");
        assert!(s.role().is_none());
        s.assign_role(Role::Initiator);
        s.assign_role(Role::Responder);
        assert_eq!(s.role(), Some(Role::Initiator));
    }

    #[test]
    fn empty_caption_clears() {
        let mut s = Session::new("demo");
        s.set_caption(Some("HELLO".into()));
        assert_eq!(s.caption(), Some("HELLO"));
        s.set_caption(Some(String::new()));
        assert_eq!(s.caption(), None);
    }
}
