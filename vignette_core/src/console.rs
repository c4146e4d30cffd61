//! Debug console.
//!
//! Provides:
//! - Console variables (cvars) with typed values
//! - Command registration and execution
//! - Bounded command history
//!
//! # Usage
//! ```ignore
//! let mut console = Console::new();
//! console.register_cvar("tl_autoplay", CvarValue::Bool(true), "Autoplay past the lock", CvarFlags::NONE);
//! console.exec("tl_autoplay 0")?;
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, bail, Context};

/// Console variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum CvarValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl CvarValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CvarValue::Float(v) => Some(*v),
            CvarValue::Int(v) => Some(*v as f64),
            CvarValue::String(s) => s.parse().ok(),
            CvarValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            CvarValue::Bool(v) => *v,
            CvarValue::Int(v) => *v != 0,
            CvarValue::Float(v) => *v != 0.0,
            CvarValue::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
        }
    }

    /// Parses user input: int, then float, then bool, then string.
    pub fn parse(input: &str) -> Self {
        if let Ok(v) = input.parse::<i64>() {
            CvarValue::Int(v)
        } else if let Ok(v) = input.parse::<f64>() {
            CvarValue::Float(v)
        } else if input == "true" {
            CvarValue::Bool(true)
        } else if input == "false" {
            CvarValue::Bool(false)
        } else {
            CvarValue::String(input.trim_matches('"').to_string())
        }
    }
}

impl std::fmt::Display for CvarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CvarValue::Int(v) => write!(f, "{}", v),
            CvarValue::Float(v) => write!(f, "{}", v),
            CvarValue::String(v) => write!(f, "\"{}\"", v),
            CvarValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub value: CvarValue,
    pub default: CvarValue,
    pub description: String,
    pub flags: CvarFlags,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CvarFlags: u32 {
        const NONE = 0;
        const READ_ONLY = 1 << 0;
        const DEBUG = 1 << 1;        // Diagnostics only
    }
}

type CvarTable = Arc<RwLock<BTreeMap<String, Cvar>>>;

/// Command handler function type.
pub type CommandHandler =
    Box<dyn Fn(&[&str], &mut ConsoleContext) -> anyhow::Result<()> + Send + Sync>;

/// Context passed to command handlers.
pub struct ConsoleContext {
    pub output: Vec<String>,
    cvars: CvarTable,
}

impl ConsoleContext {
    pub fn print(&mut self, msg: impl Into<String>) {
        self.output.push(msg.into());
    }

    pub fn get_cvar(&self, name: &str) -> Option<CvarValue> {
        read_cvar(&self.cvars, name)
    }

    pub fn set_cvar(&self, name: &str, value: CvarValue) -> anyhow::Result<()> {
        write_cvar(&self.cvars, name, value)
    }
}

fn read_cvar(cvars: &CvarTable, name: &str) -> Option<CvarValue> {
    cvars.read().ok()?.get(name).map(|c| c.value.clone())
}

fn write_cvar(cvars: &CvarTable, name: &str, value: CvarValue) -> anyhow::Result<()> {
    let mut cvars = cvars.write().map_err(|_| anyhow!("cvar lock poisoned"))?;
    let Some(cvar) = cvars.get_mut(name) else {
        bail!("unknown cvar: {}", name);
    };
    if cvar.flags.contains(CvarFlags::READ_ONLY) {
        bail!("cvar {} is read-only", name);
    }
    cvar.value = value;
    Ok(())
}

pub struct Console {
    cvars: CvarTable,
    commands: HashMap<String, CommandHandler>,
    history: VecDeque<String>,
    max_history: usize,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        let mut console = Self {
            cvars: Arc::new(RwLock::new(BTreeMap::new())),
            commands: HashMap::new(),
            history: VecDeque::new(),
            max_history: 64,
        };
        console.register_builtin_commands();
        console
    }

    fn register_builtin_commands(&mut self) {
        self.register_command("echo", |args, ctx| {
            ctx.print(args.join(" "));
            Ok(())
        });

        self.register_command("help", |_args, ctx| {
            ctx.print("commands: status, progress <v>, wheel <dy>, cvarlist, set <cvar> <value>, echo, help, quit");
            Ok(())
        });

        self.register_command("cvarlist", |_args, ctx| {
            let lines: Vec<String> = {
                let cvars = ctx.cvars.read().map_err(|_| anyhow!("cvar lock poisoned"))?;
                cvars
                    .values()
                    .map(|c| format!("  {} = {} (default: {}) {}", c.name, c.value, c.default, c.description))
                    .collect()
            };
            for line in lines {
                ctx.print(line);
            }
            Ok(())
        });

        self.register_command("set", |args, ctx| {
            if args.len() < 2 {
                bail!("usage: set <cvar> <value>");
            }
            let name = args[0];
            let value = CvarValue::parse(&args[1..].join(" "));
            let shown = value.to_string();
            ctx.set_cvar(name, value)?;
            ctx.print(format!("{} = {}", name, shown));
            Ok(())
        });
    }

    pub fn register_cvar(
        &mut self,
        name: &str,
        default: CvarValue,
        description: &str,
        flags: CvarFlags,
    ) -> anyhow::Result<()> {
        let cvar = Cvar {
            name: name.to_string(),
            value: default.clone(),
            default,
            description: description.to_string(),
            flags,
        };
        self.cvars
            .write()
            .map_err(|_| anyhow!("cvar lock poisoned"))?
            .insert(name.to_string(), cvar);
        Ok(())
    }

    pub fn register_command<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&[&str], &mut ConsoleContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.commands.insert(name.to_string(), Box::new(handler));
    }

    /// Executes a console command line and returns its output lines.
    pub fn exec(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            return Ok(Vec::new());
        }

        self.history.push_back(line.to_string());
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }

        let tokens = parse_command_line(line);
        let Some((cmd_name, rest)) = tokens.split_first() else {
            return Ok(Vec::new());
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        let mut ctx = ConsoleContext {
            output: Vec::new(),
            cvars: Arc::clone(&self.cvars),
        };

        if let Some(handler) = self.commands.get(cmd_name.as_str()) {
            handler(&args, &mut ctx).with_context(|| format!("command '{}'", cmd_name))?;
            return Ok(ctx.output);
        }

        // A bare cvar name queries it; with arguments it sets it.
        let cvar = self
            .cvars
            .read()
            .ok()
            .and_then(|c| c.get(cmd_name.as_str()).map(|c| (c.value.clone(), c.default.clone())));
        match cvar {
            Some((value, default)) if args.is_empty() => {
                ctx.print(format!("{} = {} (default: {})", cmd_name, value, default));
            }
            Some(_) => {
                let value = CvarValue::parse(&args.join(" "));
                let shown = value.to_string();
                write_cvar(&self.cvars, cmd_name, value)?;
                ctx.print(format!("{} = {}", cmd_name, shown));
            }
            None => ctx.print(format!("Unknown command: {}", cmd_name)),
        }
        Ok(ctx.output)
    }

    pub fn get_cvar(&self, name: &str) -> Option<CvarValue> {
        read_cvar(&self.cvars, name)
    }

    /// Reads a cvar as a flag; unknown cvars read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.get_cvar(name).is_some_and(|v| v.as_bool())
    }

    pub fn set_cvar(&self, name: &str, value: CvarValue) -> anyhow::Result<()> {
        write_cvar(&self.cvars, name, value)
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }
}

/// Splits a command line into tokens, respecting double quotes.
pub fn parse_command_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
