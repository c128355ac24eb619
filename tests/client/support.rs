//! Shared fixtures: an app wired to an in-memory backend and identity.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use things_sync::{
    App, ClientConfig, InMemoryBackend, InMemoryIdentity, NewThing, Provider, RandomThingFactory,
    User,
};

pub const TABLE: &str = "things";
pub const SETTLE: Duration = Duration::from_secs(5);

pub fn ada() -> User {
    User::new("user-ada", "Ada Lovelace", "https://avatars.example/ada.png")
}

pub fn grace() -> User {
    User::new("user-grace", "Grace Hopper", "https://avatars.example/grace.png")
}

pub struct Harness {
    pub app: App,
    pub backend: InMemoryBackend,
    pub identity: InMemoryIdentity,
}

impl Harness {
    /// Ada signs in with Google, Grace with GitHub. Nobody is signed in yet.
    pub fn new(rows: Vec<NewThing>) -> Self {
        let identity = InMemoryIdentity::new()
            .with_account(Provider::Google, ada())
            .with_account(Provider::Github, grace());
        Self::with_identity(rows, identity)
    }

    pub fn with_identity(rows: Vec<NewThing>, identity: InMemoryIdentity) -> Self {
        let backend = InMemoryBackend::new();
        backend.seed(TABLE, rows).unwrap();

        let app = App::with_factory(
            ClientConfig::local(),
            Arc::new(identity.clone()),
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            Box::new(RandomThingFactory::new(StdRng::seed_from_u64(17))),
        )
        .unwrap();

        Self {
            app,
            backend,
            identity,
        }
    }

    /// Started and settled.
    pub fn started(rows: Vec<NewThing>) -> Self {
        let mut harness = Self::new(rows);
        harness.app.start().unwrap();
        harness.settle();
        harness
    }

    pub fn settle(&mut self) {
        assert!(self.app.settle(SETTLE), "client did not settle");
    }

    pub fn sign_in(&mut self, provider: Provider) {
        self.app.sign_in(provider).unwrap();
        self.settle();
    }

    pub fn sign_out(&mut self) {
        self.app.sign_out().unwrap();
        self.settle();
    }

    pub fn shared_names(&self) -> Vec<String> {
        names(&self.app.view().shared_things)
    }

    pub fn owned_names(&self) -> Vec<String> {
        names(&self.app.view().owned_things)
    }
}

fn names(table: &things_sync::TableView) -> Vec<String> {
    table.rows.iter().map(|row| row.name.clone()).collect()
}

/// A(10) owned by Ada, B(50) owned by Grace. Seeded ids are 1 and 2.
pub fn two_rows() -> Vec<NewThing> {
    vec![
        NewThing::new("A", 10, ada().id),
        NewThing::new("B", 50, grace().id),
    ]
}
