//! Session and identity plumbing.
//!
//! A request is either anonymous or carries an identity naming a seller id.
//! Handlers that need a seller take [`CurrentSeller`]; when it cannot be
//! resolved the extractor fails with [`AppError::Unauthenticated`] before the
//! handler body runs, which renders as a redirect to `/login`.

use std::time::Duration;

use actix_identity::{config::LogoutBehaviour, Identity, IdentityExt, IdentityMiddleware};
use actix_session::{storage::CookieSessionStore, SessionExt, SessionMiddleware};
use actix_utils::future::{ready, Ready};
use actix_web::{cookie::Key, dev::Payload, FromRequest, HttpMessage, HttpRequest};

use crate::{errors::AppError, flash};

/// Capability of an entity that can be bound to a session.
pub trait Authenticatable {
    /// Stable key stored in the session and resolved back on later requests.
    fn identity_key(&self) -> String;
}

pub fn session_middleware(key: Key, cookie_secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_secure(cookie_secure)
        .build()
}

/// Logout only drops the identity keys so notices queued during logout
/// survive into the next page.
pub fn identity_middleware(session_ttl: Option<Duration>) -> IdentityMiddleware {
    IdentityMiddleware::builder()
        .visit_deadline(session_ttl)
        .logout_behaviour(LogoutBehaviour::DeleteIdentityKeys)
        .build()
}

/// Anonymous -> Authenticated.
pub fn establish(request: &HttpRequest, subject: &impl Authenticatable) -> Result<(), AppError> {
    Identity::login(&request.extensions(), subject.identity_key())?;
    Ok(())
}

/// The authenticated seller of the current request.
pub struct CurrentSeller {
    pub seller_id: i64,
    identity: Identity,
}

impl CurrentSeller {
    fn resolve(req: &HttpRequest) -> Option<Self> {
        let identity = req.get_identity().ok()?;
        let raw = match identity.id() {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Unreadable identity in session: {}", e);
                return None;
            }
        };
        match raw.parse::<i64>() {
            Ok(seller_id) => Some(CurrentSeller {
                seller_id,
                identity,
            }),
            Err(_) => {
                log::warn!("Invalid seller id in session: {:?}", raw);
                None
            }
        }
    }

    /// Authenticated -> Anonymous.
    pub fn logout(self) {
        log::info!("Seller {} logged out", self.seller_id);
        self.identity.logout();
    }
}

impl FromRequest for CurrentSeller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(match Self::resolve(req) {
            Some(seller) => Ok(seller),
            None => {
                flash::push(&req.get_session(), AppError::Unauthenticated.notice());
                Err(AppError::Unauthenticated)
            }
        })
    }
}
