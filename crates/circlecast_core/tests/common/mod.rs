#![allow(dead_code)]

use circlecast_core::{
    AccountService, AuthenticatedUser, Clock, ServicePolicy, SessionService, SignupRequest,
    SqliteGraphRepository, UserRecord,
};
use std::cell::Cell;
use std::rc::Rc;

pub const PASSWORD: &str = "correct-horse";

/// Test clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock(Rc<Cell<i64>>);

impl ManualClock {
    pub fn at(now_ms: i64) -> Self {
        Self(Rc::new(Cell::new(now_ms)))
    }

    pub fn advance(&self, delta_ms: i64) {
        self.0.set(self.0.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_epoch_ms(&self) -> i64 {
        self.0.get()
    }
}

pub fn signup_request(handle: &str) -> SignupRequest {
    SignupRequest {
        handle: handle.to_string(),
        email: format!("{handle}@example.org"),
        password: PASSWORD.to_string(),
        confirm_password: PASSWORD.to_string(),
    }
}

pub fn signup(store: SqliteGraphRepository<'_>, handle: &str) -> UserRecord {
    AccountService::new(store, ServicePolicy::default())
        .signup(&signup_request(handle))
        .unwrap()
}

pub fn login_as(store: SqliteGraphRepository<'_>, handle: &str) -> AuthenticatedUser {
    let sessions = SessionService::new(store, ServicePolicy::default());
    let token = sessions.login(handle, PASSWORD).unwrap();
    sessions.authenticate(&token.value).unwrap()
}

/// Signs up and logs in one user.
pub fn register(store: SqliteGraphRepository<'_>, handle: &str) -> AuthenticatedUser {
    signup(store, handle);
    login_as(store, handle)
}
