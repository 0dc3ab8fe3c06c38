use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Manager,
    Viewer,
    Anonymous,
}

#[derive(Debug, Clone, Default)]
pub struct AdminRequest {
    pub bearer: Option<String>,
    pub nonce: Option<String>,
}

pub trait AdminRequestGate: Send + Sync {
    fn identify(&self, request: &AdminRequest) -> Actor;

    fn can_view_bookings(&self, actor: Actor) -> bool;

    fn can_manage_bookings(&self, actor: Actor) -> bool;

    fn is_authentic(&self, request: &AdminRequest) -> bool;

    fn issue_nonce(&self, request: &AdminRequest) -> Option<String>;
}

pub struct TokenGate {
    admin_token: String,
    viewer_token: Option<String>,
    nonce_secret: String,
}

impl TokenGate {
    pub fn new(admin_token: String, viewer_token: Option<String>, nonce_secret: String) -> Self {
        Self {
            admin_token,
            viewer_token: viewer_token.filter(|t| !t.is_empty()),
            nonce_secret,
        }
    }

    fn mac(&self, token: &str) -> Option<Hmac<Sha1>> {
        let mut mac = Hmac::<Sha1>::new_from_slice(self.nonce_secret.as_bytes()).ok()?;
        mac.update(b"booking-admin:");
        mac.update(token.as_bytes());
        Some(mac)
    }
}

impl AdminRequestGate for TokenGate {
    fn identify(&self, request: &AdminRequest) -> Actor {
        match request.bearer.as_deref() {
            Some(token) if !token.is_empty() && token == self.admin_token => Actor::Manager,
            Some(token) if self.viewer_token.as_deref() == Some(token) => Actor::Viewer,
            _ => Actor::Anonymous,
        }
    }

    fn can_view_bookings(&self, actor: Actor) -> bool {
        matches!(actor, Actor::Manager | Actor::Viewer)
    }

    fn can_manage_bookings(&self, actor: Actor) -> bool {
        actor == Actor::Manager
    }

    fn is_authentic(&self, request: &AdminRequest) -> bool {
        let (Some(token), Some(nonce)) = (request.bearer.as_deref(), request.nonce.as_deref())
        else {
            return false;
        };
        let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(nonce) else {
            return false;
        };
        match self.mac(token) {
            Some(mac) => mac.verify_slice(&expected).is_ok(),
            None => false,
        }
    }

    fn issue_nonce(&self, request: &AdminRequest) -> Option<String> {
        if self.identify(request) == Actor::Anonymous {
            return None;
        }
        let token = request.bearer.as_deref()?;
        let mac = self.mac(token)?;
        Some(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }
}
