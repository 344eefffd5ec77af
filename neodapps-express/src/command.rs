//! neo-express verbs and argument lists

use std::fmt;

/// Address version passed to `create`; neo-express targets N3.
pub const ADDRESS_VERSION: u8 = 53;

/// Consensus node counts neo-express can generate.
pub const ALLOWED_NODE_COUNTS: [u32; 3] = [1, 4, 7];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExpressCommand {
    Create,
    Contract,
    Reset,
    Run,
    Show,
    Transfer,
    Wallet,
}

impl ExpressCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressCommand::Create => "create",
            ExpressCommand::Contract => "contract",
            ExpressCommand::Reset => "reset",
            ExpressCommand::Run => "run",
            ExpressCommand::Show => "show",
            ExpressCommand::Transfer => "transfer",
            ExpressCommand::Wallet => "wallet",
        }
    }
}

impl fmt::Display for ExpressCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One neo-express invocation: `<exe> <verb> [options...]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: ExpressCommand,
    pub options: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(command: ExpressCommand, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command,
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// `create -c <n> -a 53 -f <name>`. Node counts other than 1, 4 or 7
    /// fall back to a single node.
    pub fn create(nodes: u32, name: &str) -> Self {
        let nodes = if ALLOWED_NODE_COUNTS.contains(&nodes) { nodes } else { 1 };
        Self::new(
            ExpressCommand::Create,
            [
                "-c".to_string(),
                nodes.to_string(),
                "-a".to_string(),
                ADDRESS_VERSION.to_string(),
                "-f".to_string(),
                name.to_string(),
            ],
        )
    }

    /// `run -i <config> <node index>`
    pub fn run(config: &str, node_index: usize) -> Self {
        Self::new(
            ExpressCommand::Run,
            ["-i".to_string(), config.to_string(), node_index.to_string()],
        )
    }

    /// `wallet create -i <config> <name>`
    pub fn wallet_create(config: &str, name: &str) -> Self {
        Self::new(ExpressCommand::Wallet, ["create", "-i", config, name])
    }

    /// `transfer <amount> <asset> <from> <to> -i <config>`
    pub fn transfer(amount: &str, asset: &str, from: &str, to: &str, config: &str) -> Self {
        Self::new(
            ExpressCommand::Transfer,
            [amount, asset, from, to, "-i", config],
        )
    }

    /// Process arguments, verb first.
    pub fn args(&self) -> Vec<String> {
        std::iter::once(self.command.as_str().to_string())
            .chain(self.options.iter().cloned())
            .collect()
    }

    /// The command as typed into a shell.
    pub fn shell_line(&self, executable: &str) -> String {
        std::iter::once(executable.to_string())
            .chain(self.args())
            .map(|arg| shell_quote(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

fn is_plain(arg: &str) -> bool {
    !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@+,%".contains(c))
}

/// Quoting for the shell the terminal runs lines through: `sh -c` or `cmd /C`.
fn shell_quote(arg: &str) -> String {
    if cfg!(windows) {
        cmd_quote(arg)
    } else {
        posix_quote(arg)
    }
}

fn posix_quote(arg: &str) -> String {
    if is_plain(arg) {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// Inside cmd double quotes a literal quote is written `""`.
fn cmd_quote(arg: &str) -> String {
    if is_plain(arg) {
        arg.to_string()
    } else {
        format!("\"{}\"", arg.replace('"', "\"\""))
    }
}
