//! Drives the client against the in-memory backend and prints each screen.
//!
//! `RUST_LOG=things_sync=debug cargo run --features demo --bin things-demo`

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use things_sync::{
    App, ClientConfig, Error, InMemoryBackend, InMemoryIdentity, NewThing, Provider, Screen,
    Thing, User,
};

const SETTLE: Duration = Duration::from_secs(5);

fn print_screen(label: &str, screen: &Screen) {
    println!("== {}", label);
    match &screen.user_details {
        Some(details) => println!("{}\n{}\n{}", details.greeting, details.avatar_url, details.uid),
        None => println!("(signed out)"),
    }
    println!("-- all things");
    match &screen.shared_error {
        Some(error) => println!("error: {}", error),
        None => print!("{}", screen.shared_things),
    }
    if screen.panels.owned_things {
        println!("-- my things");
        match &screen.owned_error {
            Some(error) => println!("error: {}", error),
            None => print!("{}", screen.owned_things),
        }
    }
    println!();
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::local();
    let backend = InMemoryBackend::new();
    backend.seed(
        &config.table,
        vec![
            NewThing::new("Rustic Granite Table", 64, "someone-else"),
            NewThing::new("Small Cotton Hat", 3, "someone-else"),
        ],
    )?;

    let identity = InMemoryIdentity::new().with_account(
        Provider::Google,
        User::new("demo-user", "Demo User", "https://avatars.example/demo.png"),
    );

    let mut app = App::new(
        config.clone(),
        Arc::new(identity),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
    )?;

    app.start()?;
    app.settle(SETTLE);
    print_screen("start-up", app.view());

    app.sign_in(Provider::Google)?;
    app.settle(SETTLE);

    for _ in 0..3 {
        app.create_thing()?;
    }
    app.settle(SETTLE);
    print_screen("after creating three things", app.view());

    // another client edits a shared row
    if let Some(row) = backend.rows(&config.table).first().cloned() {
        backend.update(&config.table, Thing { weight: 99, ..row })?;
    }

    if let Some(first) = app.view().owned_things.rows.first().map(|row| row.id) {
        app.delete_thing(first)?;
    }
    app.settle(SETTLE);
    print_screen("after an outside update and one delete", app.view());

    app.sign_out()?;
    app.settle(SETTLE);
    print_screen("signed out", app.view());

    info!(open_subscriptions = app.open_subscriptions(), "demo finished");
    app.shutdown();
    Ok(())
}
