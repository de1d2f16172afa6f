// src/parser/node.rs

use std::rc::Rc;

use crate::parser::errors::ArgumentParserError;

// --- HANDLES ---

/// Index of a command inside the parser's command arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub(crate) usize);

/// Index of a named argument inside the parser's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamedArgId(pub(crate) usize);

/// Index of a positional argument inside the parser's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionalArgId(pub(crate) usize);

/// Index of a help group inside the parser's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) usize);

/// Index of a mutual-exclusion set inside the parser's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConflictGroupId(pub(crate) usize);

/// A reference to any node kind that can take part in conflicts or groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgRef {
    Command(CommandId),
    Named(NamedArgId),
    Positional(PositionalArgId),
}

// --- HOOKS ---

/// Invoked after a named argument is parsed, with the option text as typed
/// and the stored value.
pub type NamedParseHook = Rc<dyn Fn(&str, &str) -> Result<(), ArgumentParserError>>;

/// Invoked after a positional argument consumes its tokens.
pub type PositionalParseHook = Rc<dyn Fn(&[String]) -> Result<(), ArgumentParserError>>;

/// Produces completion candidates for a positional argument from the text
/// typed so far.
pub type CompleteHook = Rc<dyn Fn(&str) -> Vec<String>>;

/// Invoked after a command finishes parsing its token run. The arguments are
/// the token that selected the command and the token run it parsed.
pub type CommandParseHook = Rc<dyn Fn(&str, &[String]) -> Result<(), ArgumentParserError>>;

// --- ARITY ---

/// How many command-line tokens a positional argument consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` tokens; fewer is an error.
    Exact(usize),
    /// Zero or one token.
    Optional,
    /// All remaining non-option tokens, possibly none.
    Unlimited,
    /// All remaining non-option tokens; the argument must appear at least
    /// once before its command finishes parsing.
    AtLeastOne,
}

// --- NODES ---

/// State shared by every node kind: identity, help text, conflict membership
/// and the parse counter.
#[derive(Clone)]
pub(crate) struct ArgData {
    pub(crate) id: String,
    pub(crate) description: String,
    pub(crate) long_description: String,
    pub(crate) conflict_group: Option<ConflictGroupId>,
    pub(crate) parse_count: u32,
    pub(crate) complete: bool,
}

impl ArgData {
    pub(crate) fn new(id: &str) -> Self {
        ArgData {
            id: id.to_string(),
            description: String::new(),
            long_description: String::new(),
            conflict_group: None,
            parse_count: 0,
            complete: true,
        }
    }
}

/// A named argument gets fired by the alias loader on behalf of another
/// argument: `id_path` locates the target, `value` may contain the `${}`
/// placeholder replaced by the firing argument's own value.
#[derive(Clone)]
pub struct AttachedNamedArg {
    pub id_path: String,
    pub value: String,
}

/// An option recognized by its long (`--name`) or short (`-n`) form.
#[derive(Clone)]
pub struct NamedArg {
    pub(crate) base: ArgData,
    pub(crate) long_name: String,
    pub(crate) short_name: Option<char>,
    pub(crate) has_value: bool,
    pub(crate) const_value: String,
    pub(crate) value: Option<String>,
    pub(crate) store_value: bool,
    pub(crate) value_help: String,
    pub(crate) parse_hook: Option<NamedParseHook>,
    pub(crate) attached_named_args: Vec<AttachedNamedArg>,
    /// When set, parsed values are stored into this argument instead. Used by
    /// cloned arguments so the application reads a single slot.
    pub(crate) value_target: Option<NamedArgId>,
}

impl NamedArg {
    pub(crate) fn new(id: &str) -> Self {
        NamedArg {
            base: ArgData::new(id),
            long_name: String::new(),
            short_name: None,
            has_value: false,
            const_value: String::new(),
            value: None,
            store_value: true,
            value_help: String::new(),
            parse_hook: None,
            attached_named_args: Vec::new(),
            value_target: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    pub fn description(&self) -> &str {
        &self.base.description
    }

    pub fn set_description(&mut self, text: &str) -> &mut Self {
        self.base.description = text.to_string();
        self
    }

    pub fn set_long_description(&mut self, text: &str) -> &mut Self {
        self.base.long_description = text.to_string();
        self
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn set_long_name(&mut self, name: &str) -> &mut Self {
        self.long_name = name.to_string();
        self
    }

    pub fn short_name(&self) -> Option<char> {
        self.short_name
    }

    pub fn set_short_name(&mut self, name: char) -> &mut Self {
        self.short_name = Some(name);
        self
    }

    pub fn has_value(&self) -> bool {
        self.has_value
    }

    pub fn set_has_value(&mut self, has_value: bool) -> &mut Self {
        self.has_value = has_value;
        self
    }

    pub fn set_const_value(&mut self, value: &str) -> &mut Self {
        self.const_value = value.to_string();
        self
    }

    pub fn set_value_help(&mut self, help: &str) -> &mut Self {
        self.value_help = help.to_string();
        self
    }

    pub fn set_store_value(&mut self, store: bool) -> &mut Self {
        self.store_value = store;
        self
    }

    pub fn set_complete(&mut self, complete: bool) -> &mut Self {
        self.base.complete = complete;
        self
    }

    pub fn set_parse_hook(&mut self, hook: NamedParseHook) -> &mut Self {
        self.parse_hook = Some(hook);
        self
    }

    /// Queues another named argument to be fired whenever this one parses.
    pub fn attach_named_arg(&mut self, id_path: &str, value: &str) -> &mut Self {
        self.attached_named_args.push(AttachedNamedArg {
            id_path: id_path.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Value stored into this node's own slot. Cloned arguments redirect
    /// their stores elsewhere; use `ArgumentParser::named_arg_value` to read
    /// through the redirection.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn parse_count(&self) -> u32 {
        self.base.parse_count
    }

    /// The form shown in diagnostics: long form preferred over short.
    pub(crate) fn display_name(&self) -> String {
        if !self.long_name.is_empty() {
            format!("--{}", self.long_name)
        } else if let Some(short) = self.short_name {
            format!("-{short}")
        } else {
            self.base.id.clone()
        }
    }
}

/// An argument identified by its position among the non-option tokens of a
/// command.
#[derive(Clone)]
pub struct PositionalArg {
    pub(crate) base: ArgData,
    pub(crate) arity: Arity,
    pub(crate) values: Vec<String>,
    pub(crate) store_value: bool,
    pub(crate) parse_hook: Option<PositionalParseHook>,
    pub(crate) complete_hook: Option<CompleteHook>,
}

impl PositionalArg {
    pub(crate) fn new(id: &str, arity: Arity) -> Self {
        PositionalArg {
            base: ArgData::new(id),
            arity,
            values: Vec::new(),
            store_value: true,
            parse_hook: None,
            complete_hook: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    pub fn description(&self) -> &str {
        &self.base.description
    }

    pub fn set_description(&mut self, text: &str) -> &mut Self {
        self.base.description = text.to_string();
        self
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn set_store_value(&mut self, store: bool) -> &mut Self {
        self.store_value = store;
        self
    }

    pub fn set_complete(&mut self, complete: bool) -> &mut Self {
        self.base.complete = complete;
        self
    }

    pub fn set_parse_hook(&mut self, hook: PositionalParseHook) -> &mut Self {
        self.parse_hook = Some(hook);
        self
    }

    pub fn set_complete_hook(&mut self, hook: CompleteHook) -> &mut Self {
        self.complete_hook = Some(hook);
        self
    }

    /// Tokens consumed so far. Cleared on the first consumption after a
    /// parse-count reset, so a parser instance can be reused.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn parse_count(&self) -> u32 {
        self.base.parse_count
    }
}

/// A verb in the command tree. A command owns lists of child commands, named
/// arguments, positional arguments and help groups; an alias command instead
/// forwards everything to its attached target.
#[derive(Clone)]
pub struct Command {
    pub(crate) base: ArgData,
    pub(crate) parent: Option<CommandId>,
    /// `Some` makes this command an alias of the referenced command.
    pub(crate) attached_command: Option<CommandId>,
    pub(crate) commands: Vec<CommandId>,
    pub(crate) named_args: Vec<NamedArgId>,
    pub(crate) positional_args: Vec<PositionalArgId>,
    pub(crate) groups: Vec<GroupId>,
    pub(crate) parse_hook: Option<CommandParseHook>,
    pub(crate) attached_named_args: Vec<AttachedNamedArg>,
    pub(crate) commands_help_header: String,
    pub(crate) named_args_help_header: String,
    pub(crate) positional_args_help_header: String,
}

impl Command {
    pub(crate) fn new(id: &str) -> Self {
        Command {
            base: ArgData::new(id),
            parent: None,
            attached_command: None,
            commands: Vec::new(),
            named_args: Vec::new(),
            positional_args: Vec::new(),
            groups: Vec::new(),
            parse_hook: None,
            attached_named_args: Vec::new(),
            commands_help_header: "Commands:".to_string(),
            named_args_help_header: "Options:".to_string(),
            positional_args_help_header: "Arguments:".to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    pub fn description(&self) -> &str {
        &self.base.description
    }

    pub fn set_description(&mut self, text: &str) -> &mut Self {
        self.base.description = text.to_string();
        self
    }

    pub fn long_description(&self) -> &str {
        &self.base.long_description
    }

    pub fn set_long_description(&mut self, text: &str) -> &mut Self {
        self.base.long_description = text.to_string();
        self
    }

    pub fn set_complete(&mut self, complete: bool) -> &mut Self {
        self.base.complete = complete;
        self
    }

    pub fn set_parse_hook(&mut self, hook: CommandParseHook) -> &mut Self {
        self.parse_hook = Some(hook);
        self
    }

    pub fn attach_named_arg(&mut self, id_path: &str, value: &str) -> &mut Self {
        self.attached_named_args.push(AttachedNamedArg {
            id_path: id_path.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn set_commands_help_header(&mut self, header: &str) -> &mut Self {
        self.commands_help_header = header.to_string();
        self
    }

    pub fn set_named_args_help_header(&mut self, header: &str) -> &mut Self {
        self.named_args_help_header = header.to_string();
        self
    }

    pub fn set_positional_args_help_header(&mut self, header: &str) -> &mut Self {
        self.positional_args_help_header = header.to_string();
        self
    }

    pub fn parse_count(&self) -> u32 {
        self.base.parse_count
    }

    pub fn is_alias(&self) -> bool {
        self.attached_command.is_some()
    }
}

/// A labelled section in generated help; arguments registered in a group are
/// listed under its header instead of the command's default section.
#[derive(Clone)]
pub struct Group {
    pub(crate) id: String,
    pub(crate) header: String,
    pub(crate) arguments: Vec<ArgRef>,
}

impl Group {
    pub(crate) fn new(id: &str) -> Self {
        Group {
            id: id.to_string(),
            header: String::new(),
            arguments: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn set_header(&mut self, header: &str) -> &mut Self {
        self.header = header.to_string();
        self
    }
}
