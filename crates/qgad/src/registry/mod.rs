//! Command registry: the static mapping from command names to handlers,
//! plus the configured blacklist.
//!
//! The registry is built once at start-up and passed by reference to the
//! dispatch loop; it is never mutated while requests are served.

mod arguments;
mod errors;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use qga_config::Blacklist;
use serde::Serialize;
use serde_json::Value;

pub use arguments::Arguments;
pub use errors::{CommandError, RegistryError};

/// Executes one command.
///
/// Handlers run synchronously on the dispatch thread and are never
/// interrupted; they validate their own argument shape.
pub trait CommandHandler: Send + Sync {
    /// Runs the command and returns its `return` payload.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] to produce an error response.
    fn call(
        &self,
        context: &CommandContext<'_>,
        arguments: &Arguments,
    ) -> Result<Value, CommandError>;
}

struct FnHandler<F>(F);

impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&CommandContext<'_>, &Arguments) -> Result<Value, CommandError> + Send + Sync,
{
    fn call(
        &self,
        context: &CommandContext<'_>,
        arguments: &Arguments,
    ) -> Result<Value, CommandError> {
        (self.0)(context, arguments)
    }
}

/// State visible to a running handler.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    registry: &'a CommandRegistry,
}

impl<'a> CommandContext<'a> {
    pub(crate) const fn new(registry: &'a CommandRegistry) -> Self {
        Self { registry }
    }

    /// Registry the command was dispatched from.
    #[must_use]
    pub const fn registry(&self) -> &'a CommandRegistry {
        self.registry
    }
}

/// Public description of a registered command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    /// Registered command name.
    pub name: String,
    /// `false` when the blacklist disables the command.
    pub enabled: bool,
}

/// Name-to-handler mapping with a blacklist.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<dyn CommandHandler>>,
    blacklist: Blacklist,
}

impl CommandRegistry {
    /// Creates an empty registry with no blacklist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the blacklist.
    #[must_use]
    pub fn with_blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = blacklist;
        self
    }

    /// Registers `handler` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when the name is taken and
    /// [`RegistryError::EmptyName`] for blank names.
    pub fn register<H>(&mut self, name: &str, handler: H) -> Result<(), RegistryError>
    where
        H: CommandHandler + 'static,
    {
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.commands.contains_key(name) {
            return Err(RegistryError::Duplicate {
                name: name.to_owned(),
            });
        }
        self.commands.insert(name.to_owned(), Arc::new(handler));
        Ok(())
    }

    /// Registers a closure as a handler.
    ///
    /// # Errors
    ///
    /// See [`CommandRegistry::register`].
    pub fn register_fn<F>(&mut self, name: &str, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(&CommandContext<'_>, &Arguments) -> Result<Value, CommandError>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, FnHandler(handler))
    }

    /// Finds the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`].
    pub fn lookup(&self, name: &str) -> Result<&dyn CommandHandler, RegistryError> {
        self.commands
            .get(name)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_owned(),
            })
    }

    /// Returns `true` when `name` is disabled by the blacklist.
    #[must_use]
    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.contains(name)
    }

    /// Configured blacklist.
    #[must_use]
    pub const fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Registered command names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Every registered command with its enabled flag.
    pub fn descriptors(&self) -> impl Iterator<Item = CommandDescriptor> + '_ {
        self.names().map(|name| CommandDescriptor {
            name: name.to_owned(),
            enabled: !self.is_blacklisted(name),
        })
    }

    /// Blacklist entries that name no registered command.
    pub fn unknown_blacklist_entries(&self) -> impl Iterator<Item = &str> {
        self.blacklist
            .iter()
            .filter(|name| !self.commands.contains_key(*name))
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandRegistry")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("blacklist", &self.blacklist)
            .finish()
    }
}
