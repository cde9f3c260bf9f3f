mod commands;

use std::{future::Future, pin::Pin};

use indexmap::IndexMap;
use log::warn;
use serde_json::{Map, Value};

use crate::{bridge::WalletHandler, error::WalletConnectError};

pub use commands::registry;

pub type ExecutorFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, WalletConnectError>> + Send + 'a>>;

// Fully custom dispatch logic for commands that are not a 1:1 wallet-API call
pub type Executor = for<'a> fn(&'a dyn WalletHandler, Map<String, Value>) -> ExecutorFuture<'a>;

// Declared parameter coercion type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
    BigDecimal,
    Object,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub optional: bool,
    // No type tag means the value is passed through unchanged
    pub kind: Option<ParamType>,
    pub default: Option<Value>,
    // Hidden params are resolved and dispatched but left out of the
    // confirmation dialog shown to the user
    pub hidden: bool,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamType) -> Self {
        Self {
            name,
            optional: false,
            kind: Some(kind),
            default: None,
            hidden: false,
        }
    }

    pub fn optional(name: &'static str, kind: ParamType) -> Self {
        Self {
            optional: true,
            ..Self::required(name, kind)
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

// How a command is executed once it has been confirmed.
// The mode is resolved once at registry definition, never inferred
// from which optional fields happen to be present on a request.
#[derive(Debug, Clone)]
pub enum DispatchMode {
    // Invoke the wallet-API operation named `target` (which may differ
    // from the command name) with the coerced params
    WalletApi { target: &'static str },
    // Build and hand off a local notification instead of calling the wallet
    Notification,
    // Run fully custom executor logic
    Executor(Executor),
}

#[derive(Debug, Clone)]
pub struct CommandDefinition {
    // Unique key within the registry; prefixed with "chia_" on the wire
    pub command: &'static str,
    pub mode: DispatchMode,
    pub params: Vec<ParamSpec>,
    // If true, the command may run regardless of which wallet key is active
    pub requires_all_fingerprints: bool,
    // If true, the orchestrator waits for wallet sync before dispatch
    pub requires_wallet_sync: bool,
    // If true, the user may remember a "don't ask again" choice
    // for this command on this pair
    pub bypassable_confirmation: bool,
}

impl CommandDefinition {
    pub fn api(command: &'static str) -> Self {
        Self {
            command,
            mode: DispatchMode::WalletApi { target: command },
            params: Vec::new(),
            requires_all_fingerprints: false,
            requires_wallet_sync: false,
            bypassable_confirmation: false,
        }
    }

    // For commands whose wallet-API operation name differs from the command
    pub fn api_as(command: &'static str, target: &'static str) -> Self {
        Self {
            mode: DispatchMode::WalletApi { target },
            ..Self::api(command)
        }
    }

    pub fn notification(command: &'static str) -> Self {
        Self {
            mode: DispatchMode::Notification,
            ..Self::api(command)
        }
    }

    pub fn executor(command: &'static str, executor: Executor) -> Self {
        Self {
            mode: DispatchMode::Executor(executor),
            ..Self::api(command)
        }
    }

    pub fn params(mut self, params: Vec<ParamSpec>) -> Self {
        self.params = params;
        self
    }

    pub fn all_fingerprints(mut self) -> Self {
        self.requires_all_fingerprints = true;
        self
    }

    pub fn wait_for_sync(mut self) -> Self {
        self.requires_wallet_sync = true;
        self
    }

    pub fn bypassable(mut self) -> Self {
        self.bypassable_confirmation = true;
        self
    }
}

// Read-only lookup table of all commands supported by the bridge
pub struct CommandRegistry {
    commands: IndexMap<&'static str, CommandDefinition>,
}

impl CommandRegistry {
    pub fn new(definitions: Vec<CommandDefinition>) -> Self {
        let mut commands = IndexMap::with_capacity(definitions.len());
        for definition in definitions {
            let command = definition.command;
            if commands.insert(command, definition).is_some() {
                warn!("The command '{}' was already registered !", command);
            }
        }

        Self { commands }
    }

    pub fn get(&self, command: &str) -> Option<&CommandDefinition> {
        self.commands.get(command)
    }

    pub fn has_command(&self, command: &str) -> bool {
        self.commands.contains_key(command)
    }

    // Prefixed method names, as negotiated in session namespaces
    pub fn methods(&self) -> Vec<String> {
        self.commands
            .keys()
            .map(|command| format!("{}{}", crate::config::COMMAND_PREFIX, command))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
