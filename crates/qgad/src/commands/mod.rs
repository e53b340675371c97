//! Commands every agent build provides.
//!
//! Business commands register through [`CommandRegistry::register`] next to
//! these; the built-ins only cover liveness and discovery.

use serde::Serialize;
use serde_json::{Value, json};

use crate::registry::{
    Arguments, CommandContext, CommandDescriptor, CommandError, CommandRegistry, RegistryError,
};

/// Liveness check; returns an empty object.
pub const GUEST_PING: &str = "guest-ping";
/// Echoes the caller's integer token so the host can resynchronise.
pub const GUEST_SYNC: &str = "guest-sync";
/// Reports the agent version and its commands.
pub const GUEST_INFO: &str = "guest-info";

/// Registers the built-in commands.
///
/// # Errors
///
/// Returns [`RegistryError::Duplicate`] when a built-in name is taken.
pub fn register_builtin_commands(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register_fn(GUEST_PING, guest_ping)?;
    registry.register_fn(GUEST_SYNC, guest_sync)?;
    registry.register_fn(GUEST_INFO, guest_info)?;
    Ok(())
}

fn guest_ping(_: &CommandContext<'_>, _: &Arguments) -> Result<Value, CommandError> {
    Ok(json!({}))
}

fn guest_sync(_: &CommandContext<'_>, arguments: &Arguments) -> Result<Value, CommandError> {
    arguments.required_integer("id").cloned()
}

#[derive(Debug, Serialize)]
struct AgentInfo {
    version: &'static str,
    supported_command: Vec<CommandDescriptor>,
}

fn guest_info(context: &CommandContext<'_>, _: &Arguments) -> Result<Value, CommandError> {
    let info = AgentInfo {
        version: env!("CARGO_PKG_VERSION"),
        supported_command: context.registry().descriptors().collect(),
    };
    serde_json::to_value(info).map_err(|error| CommandError::failed(error.to_string()))
}

#[cfg(test)]
mod tests {
    use qga_config::Blacklist;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn registry() -> CommandRegistry {
        let mut registry =
            CommandRegistry::new().with_blacklist(Blacklist::from_entries([GUEST_PING]));
        register_builtin_commands(&mut registry).expect("register built-ins");
        registry
    }

    fn call(
        registry: &CommandRegistry,
        name: &str,
        arguments: Value,
    ) -> Result<Value, CommandError> {
        let arguments = match arguments {
            Value::Object(map) => Arguments::new(Some(map)),
            _ => Arguments::new(None),
        };
        registry
            .lookup(name)
            .expect("registered")
            .call(&CommandContext::new(registry), &arguments)
    }

    #[rstest]
    fn ping_returns_empty_object(registry: CommandRegistry) {
        assert_eq!(call(&registry, GUEST_PING, Value::Null), Ok(json!({})));
    }

    #[rstest]
    fn sync_echoes_identifier(registry: CommandRegistry) {
        assert_eq!(
            call(&registry, GUEST_SYNC, json!({"id": 1_234_567})),
            Ok(json!(1_234_567))
        );
    }

    #[rstest]
    fn sync_requires_an_identifier(registry: CommandRegistry) {
        let error = call(&registry, GUEST_SYNC, Value::Null).expect_err("missing id");
        assert!(matches!(error, CommandError::MissingParameter { .. }));
    }

    #[rstest]
    fn info_lists_commands_with_enabled_flags(registry: CommandRegistry) {
        let info = call(&registry, GUEST_INFO, Value::Null).expect("guest-info");
        assert_eq!(info["version"], json!(env!("CARGO_PKG_VERSION")));
        assert_eq!(
            info["supported_command"],
            json!([
                {"name": GUEST_INFO, "enabled": true},
                {"name": GUEST_PING, "enabled": false},
                {"name": GUEST_SYNC, "enabled": true},
            ])
        );
    }

    #[test]
    fn registering_twice_fails() {
        let mut registry = CommandRegistry::new();
        register_builtin_commands(&mut registry).expect("first");
        assert!(matches!(
            register_builtin_commands(&mut registry),
            Err(RegistryError::Duplicate { .. })
        ));
    }
}
