//! View models - pure projections of client state into displayable data.
//!
//! Nothing here touches markup. A front end binds [`Screen`] to whatever
//! widgets it has; [`TableView`] also implements `Display` as a plain-text
//! table for terminals and logs.

use std::fmt;

use crate::identity::User;
use crate::thing::{Thing, ThingId};

pub const NAME_COLUMN: &str = "Name";
pub const WEIGHT_COLUMN: &str = "Weight";

/// Whether rows carry per-row actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowActions {
    None,
    /// Each row gets a delete action bound to its id.
    Delete,
}

/// An action a row exposes to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Delete(ThingId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: ThingId,
    pub name: String,
    pub weight: u32,
    pub action: Option<RowAction>,
}

impl Row {
    /// Weight as displayed, e.g. `"50 lbs."`.
    pub fn weight_label(&self) -> String {
        format!("{} lbs.", self.weight)
    }
}

/// A header plus one row per thing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableView {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Row>,
}

impl TableView {
    /// Project already-ordered things into rows, keeping their order.
    pub fn project(things: &[&Thing], actions: RowActions) -> Self {
        let mut columns = vec![NAME_COLUMN, WEIGHT_COLUMN];
        if actions == RowActions::Delete {
            // action column has no label
            columns.push("");
        }

        let rows = things
            .iter()
            .map(|thing| Row {
                id: thing.id,
                name: thing.name.clone(),
                weight: thing.weight,
                action: match actions {
                    RowActions::None => None,
                    RowActions::Delete => Some(RowAction::Delete(thing.id)),
                },
            })
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.name.as_str()).collect()
    }
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .rows
            .iter()
            .map(|row| row.name.chars().count())
            .chain(std::iter::once(NAME_COLUMN.chars().count()))
            .max()
            .unwrap_or(0);

        writeln!(f, "{:<name_width$}  {:>9}", NAME_COLUMN, WEIGHT_COLUMN)?;
        for row in &self.rows {
            write!(f, "{:<name_width$}  {:>9}", row.name, row.weight_label())?;
            if let Some(RowAction::Delete(id)) = row.action {
                write!(f, "  [delete #{}]", id)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Greeting block for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDetails {
    pub greeting: String,
    pub avatar_url: String,
    pub uid: String,
}

impl UserDetails {
    pub fn for_user(user: &User) -> Self {
        Self {
            greeting: format!("Hi {}", user.full_name),
            avatar_url: user.avatar_url.clone(),
            uid: format!("UID: {}", user.id),
        }
    }
}

/// Visibility of the UI regions that depend on the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panels {
    pub signed_in: bool,
    pub signed_out: bool,
    pub owned_things: bool,
}

impl Panels {
    pub fn signed_in() -> Self {
        Self {
            signed_in: true,
            signed_out: false,
            owned_things: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            signed_in: false,
            signed_out: true,
            owned_things: false,
        }
    }
}

impl Default for Panels {
    fn default() -> Self {
        Self::signed_out()
    }
}

/// Everything currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    pub panels: Panels,
    pub user_details: Option<UserDetails>,
    pub shared_things: TableView,
    pub owned_things: TableView,
    /// Message shown in place of the shared table when it could not load.
    pub shared_error: Option<String>,
    pub owned_error: Option<String>,
    /// Number of table renders so far.
    pub renders: usize,
}
