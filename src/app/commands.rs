//! Mutation commands. Writes go to the store only; caches pick up the
//! result from the change feed like any other client's write.

use thiserror::Error;
use tracing::{info, warn};

use super::App;
use crate::identity::User;
use crate::thing::{NewThing, ThingId};

/// A store write issued by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(NewThing),
    Delete(ThingId),
}

/// A command refused before anything was sent to the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandRejected {
    #[error("must be signed in to {0}")]
    NotSignedIn(&'static str),
    #[error("thing {id} belongs to another user")]
    NotOwner { id: ThingId },
    #[error("thing {0} is not in the local view")]
    UnknownThing(ThingId),
}

impl App {
    fn signed_in_user(&self, action: &'static str) -> Result<User, CommandRejected> {
        match self.identity.current_user() {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(CommandRejected::NotSignedIn(action)),
            Err(err) => {
                warn!(error = %err, "could not read current user");
                Err(CommandRejected::NotSignedIn(action))
            }
        }
    }

    /// Insert a generated thing owned by the signed-in user.
    pub fn create_thing(&mut self) -> Result<(), CommandRejected> {
        let user = self
            .signed_in_user("create a thing")
            .inspect_err(|err| warn!(error = %err, "create rejected"))?;

        let thing = self.factory.next_thing(&user.id);
        info!(name = %thing.name, weight = thing.weight, owner = %thing.owner, "creating thing");

        let payload = thing.clone();
        self.spawn_write(Command::Create(thing), move |store, table| {
            store.insert(table, &payload).map(|_| ())
        });
        Ok(())
    }

    /// Delete one of the signed-in user's things.
    pub fn delete_thing(&mut self, id: ThingId) -> Result<(), CommandRejected> {
        let user = self
            .signed_in_user("delete a thing")
            .inspect_err(|err| warn!(id, error = %err, "delete rejected"))?;

        let owner = self
            .owned
            .get(id)
            .or_else(|| self.shared.get(id))
            .map(|thing| thing.owner.clone());
        match owner {
            None => {
                let err = CommandRejected::UnknownThing(id);
                warn!(id, error = %err, "delete rejected");
                return Err(err);
            }
            Some(owner) if owner != user.id => {
                let err = CommandRejected::NotOwner { id };
                warn!(id, user = %user.id, error = %err, "delete rejected");
                return Err(err);
            }
            Some(_) => {}
        }

        info!(id, "deleting thing");
        self.spawn_write(Command::Delete(id), move |store, table| {
            store.delete_by_id(table, id)
        });
        Ok(())
    }
}
