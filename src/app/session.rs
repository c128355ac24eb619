//! Session controller: reacts to authentication transitions.

use tracing::{info, warn};

use super::App;
use crate::cache::CacheKind;
use crate::identity::{AuthError, Provider, User};
use crate::store::Filter;
use crate::view::{Panels, UserDetails};

impl App {
    /// Start the provider's sign-in flow. The resulting transition arrives
    /// through the auth listener.
    pub fn sign_in(&self, provider: Provider) -> Result<(), AuthError> {
        info!(%provider, "signing in");
        self.identity.sign_in(provider).inspect_err(|err| {
            warn!(%provider, error = %err, "sign-in failed");
        })
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        info!("signing out");
        self.identity.sign_out().inspect_err(|err| {
            warn!(error = %err, "sign-out failed");
        })
    }

    /// Apply an authentication state. Safe to call repeatedly with the same
    /// state: the owned cache is only restarted when the user changes or
    /// after a sign-out.
    pub(super) fn on_auth_changed(&mut self, user: Option<User>) {
        match user {
            Some(user) => self.adjust_for_user(user),
            None => self.adjust_for_no_user(),
        }
    }

    fn adjust_for_user(&mut self, user: User) {
        self.screen.panels = Panels::signed_in();
        self.screen.user_details = Some(UserDetails::for_user(&user));

        // A failed lifecycle for the same user is not retried until the
        // session actually ends.
        let filter = Filter::owned_by(&user.id);
        let same_user = self.owned.is_started() && self.owned.filter() == Some(&filter);
        if !same_user {
            if self.owned.is_started() {
                info!(user = %user.id, "user changed, restarting owned cache");
                self.owned.teardown();
            } else {
                info!(user = %user.id, "signed in");
            }
            self.user = Some(user);
            self.initialize(CacheKind::Owned, Some(filter));
        } else {
            self.user = Some(user);
        }
    }

    fn adjust_for_no_user(&mut self) {
        self.screen.panels = Panels::signed_out();
        self.screen.user_details = None;

        if self.user.take().is_some() {
            info!("signed out");
        }
        self.owned.teardown();
        self.render(CacheKind::Owned);
    }
}
