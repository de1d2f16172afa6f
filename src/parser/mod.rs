// src/parser/mod.rs

//! A hierarchical command-line parser.
//!
//! Commands form a tree; each command owns named arguments (`--long`, `-s`),
//! positional arguments and help groups. All nodes live in arenas owned by
//! [`ArgumentParser`] and are referred to by copyable index handles, so the
//! tree can be wired up freely (aliases, conflicts, attached arguments)
//! without reference cycles.

pub mod errors;
pub mod help;
pub mod node;

pub use errors::{ArgumentParserError, ParserResult};
pub use node::{
    ArgRef, Arity, AttachedNamedArg, Command, CommandId, CommandParseHook, CompleteHook,
    ConflictGroupId, Group, GroupId, NamedArg, NamedArgId, NamedParseHook, PositionalArg,
    PositionalArgId, PositionalParseHook,
};

use node::ArgData;

/// In-flight state of a shell completion request.
struct Completion {
    target: usize,
    candidates: Vec<String>,
}

/// Owner of the whole argument tree.
pub struct ArgumentParser {
    cmds: Vec<Command>,
    named_args: Vec<NamedArg>,
    positional_args: Vec<PositionalArg>,
    groups: Vec<Group>,
    conflict_groups: Vec<Vec<ArgRef>>,
    root: Option<CommandId>,
    selected: Option<CommandId>,
    inherit_named_args: bool,
    completion: Option<Completion>,
}

impl Default for ArgumentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentParser {
    pub fn new() -> Self {
        ArgumentParser {
            cmds: Vec::new(),
            named_args: Vec::new(),
            positional_args: Vec::new(),
            groups: Vec::new(),
            conflict_groups: Vec::new(),
            root: None,
            selected: None,
            inherit_named_args: true,
            completion: None,
        }
    }

    /// When enabled (the default), a command also recognizes the named
    /// arguments of all its ancestors.
    pub fn set_inherit_named_args(&mut self, inherit: bool) {
        self.inherit_named_args = inherit;
    }

    // --- NODE CREATION ---

    pub fn add_new_command(&mut self, id: &str) -> ParserResult<CommandId> {
        check_id(id)?;
        self.cmds.push(Command::new(id));
        Ok(CommandId(self.cmds.len() - 1))
    }

    /// Creates a command that behaves like `attached` when selected: it
    /// exposes the target's children and arguments and runs the target's
    /// parse hook. Its own attached named arguments fire first.
    pub fn add_new_command_alias(
        &mut self,
        id: &str,
        attached: CommandId,
    ) -> ParserResult<CommandId> {
        check_id(id)?;
        let mut cmd = Command::new(id);
        cmd.attached_command = Some(attached);
        self.cmds.push(cmd);
        Ok(CommandId(self.cmds.len() - 1))
    }

    pub fn add_new_named_arg(&mut self, id: &str) -> ParserResult<NamedArgId> {
        check_id(id)?;
        if self.named_args.iter().any(|a| a.id() == id) {
            return Err(ArgumentParserError::IdAlreadyRegistered {
                id: id.to_string(),
                owner: "argument parser".to_string(),
            });
        }
        self.named_args.push(NamedArg::new(id));
        Ok(NamedArgId(self.named_args.len() - 1))
    }

    pub fn add_new_positional_arg(&mut self, id: &str, arity: Arity) -> ParserResult<PositionalArgId> {
        check_id(id)?;
        if self.positional_args.iter().any(|a| a.id() == id) {
            return Err(ArgumentParserError::IdAlreadyRegistered {
                id: id.to_string(),
                owner: "argument parser".to_string(),
            });
        }
        self.positional_args.push(PositionalArg::new(id, arity));
        Ok(PositionalArgId(self.positional_args.len() - 1))
    }

    pub fn add_new_group(&mut self, id: &str) -> GroupId {
        self.groups.push(Group::new(id));
        GroupId(self.groups.len() - 1)
    }

    /// Clones `source` under a new name. The clone shares the source's value
    /// slot, hooks and conflict set, and is hidden from completion.
    pub fn add_new_named_arg_alias(
        &mut self,
        source: NamedArgId,
        id: &str,
        long_name: &str,
        short_name: Option<char>,
    ) -> ParserResult<NamedArgId> {
        check_id(id)?;
        if self.named_args.iter().any(|a| a.id() == id) {
            return Err(ArgumentParserError::IdAlreadyRegistered {
                id: id.to_string(),
                owner: "argument parser".to_string(),
            });
        }
        let src = &self.named_args[source.0];
        let mut arg = NamedArg::new(id);
        arg.long_name = long_name.to_string();
        arg.short_name = short_name;
        arg.base.description = format!("Alias for '{}'", src.display_name());
        arg.has_value = src.has_value;
        arg.const_value = src.const_value.clone();
        arg.value_help = src.value_help.clone();
        arg.store_value = src.store_value;
        arg.parse_hook = src.parse_hook.clone();
        arg.attached_named_args = src.attached_named_args.clone();
        arg.base.complete = false;
        arg.value_target = Some(src.value_target.unwrap_or(source));
        let src_group = src.base.conflict_group;
        self.named_args.push(arg);
        let alias = NamedArgId(self.named_args.len() - 1);
        if let Some(group) = src_group {
            self.named_args[alias.0].base.conflict_group = Some(group);
            self.conflict_groups[group.0].push(ArgRef::Named(alias));
        }
        Ok(alias)
    }

    // --- NODE ACCESS ---

    pub fn cmd(&self, id: CommandId) -> &Command {
        &self.cmds[id.0]
    }

    pub fn cmd_mut(&mut self, id: CommandId) -> &mut Command {
        &mut self.cmds[id.0]
    }

    pub fn named_arg(&self, id: NamedArgId) -> &NamedArg {
        &self.named_args[id.0]
    }

    pub fn named_arg_mut(&mut self, id: NamedArgId) -> &mut NamedArg {
        &mut self.named_args[id.0]
    }

    pub fn positional_arg(&self, id: PositionalArgId) -> &PositionalArg {
        &self.positional_args[id.0]
    }

    pub fn positional_arg_mut(&mut self, id: PositionalArgId) -> &mut PositionalArg {
        &mut self.positional_args[id.0]
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.0]
    }

    pub fn group_mut(&mut self, id: GroupId) -> &mut Group {
        &mut self.groups[id.0]
    }

    /// Help groups registered on `cmd`, resolved through command aliases.
    pub fn command_groups(&self, cmd: CommandId) -> Vec<GroupId> {
        let eff = self.effective(cmd);
        self.cmds[eff.0].groups.clone()
    }

    /// Reads a named argument's stored value, following the redirection of
    /// cloned arguments to their source's slot.
    pub fn named_arg_value(&self, id: NamedArgId) -> Option<&str> {
        let target = self.named_args[id.0].value_target.unwrap_or(id);
        self.named_args[target.0].value.as_deref()
    }

    // --- TREE WIRING ---

    pub fn set_root_command(&mut self, id: CommandId) {
        self.root = Some(id);
    }

    pub fn root_command(&self) -> Option<CommandId> {
        self.root
    }

    /// Deepest command selected by the last `parse` call.
    pub fn selected_command(&self) -> Option<CommandId> {
        self.selected
    }

    /// Registers `child` as a subcommand of `parent`. For an alias parent the
    /// child lands in the aliased command.
    pub fn register_command(&mut self, parent: CommandId, child: CommandId) -> ParserResult<()> {
        let target = self.effective(parent);
        let child_id = self.cmds[child.0].id().to_string();
        if self.cmds[target.0]
            .commands
            .iter()
            .any(|&c| self.cmds[c.0].id() == child_id)
        {
            return Err(ArgumentParserError::IdAlreadyRegistered {
                id: child_id,
                owner: self.cmds[target.0].id().to_string(),
            });
        }
        self.cmds[child.0].parent = Some(target);
        self.cmds[target.0].commands.push(child);
        Ok(())
    }

    pub fn register_named_arg(&mut self, parent: CommandId, arg: NamedArgId) -> ParserResult<()> {
        let target = self.effective(parent);
        let arg_id = self.named_args[arg.0].id().to_string();
        if self.cmds[target.0]
            .named_args
            .iter()
            .any(|&a| self.named_args[a.0].id() == arg_id)
        {
            return Err(ArgumentParserError::IdAlreadyRegistered {
                id: arg_id,
                owner: self.cmds[target.0].id().to_string(),
            });
        }
        self.cmds[target.0].named_args.push(arg);
        Ok(())
    }

    pub fn register_positional_arg(
        &mut self,
        parent: CommandId,
        arg: PositionalArgId,
    ) -> ParserResult<()> {
        let target = self.effective(parent);
        let arg_id = self.positional_args[arg.0].id().to_string();
        if self.cmds[target.0]
            .positional_args
            .iter()
            .any(|&a| self.positional_args[a.0].id() == arg_id)
        {
            return Err(ArgumentParserError::IdAlreadyRegistered {
                id: arg_id,
                owner: self.cmds[target.0].id().to_string(),
            });
        }
        self.cmds[target.0].positional_args.push(arg);
        Ok(())
    }

    pub fn register_group(&mut self, parent: CommandId, group: GroupId) -> ParserResult<()> {
        let target = self.effective(parent);
        let group_id = self.groups[group.0].id().to_string();
        if self.cmds[target.0]
            .groups
            .iter()
            .any(|&g| self.groups[g.0].id() == group_id)
        {
            return Err(ArgumentParserError::IdAlreadyRegistered {
                id: group_id,
                owner: self.cmds[target.0].id().to_string(),
            });
        }
        self.cmds[target.0].groups.push(group);
        Ok(())
    }

    /// Adds an argument to a help group's listing.
    pub fn group_register_argument(&mut self, group: GroupId, arg: ArgRef) -> ParserResult<()> {
        if self.groups[group.0].arguments.contains(&arg) {
            return Err(ArgumentParserError::IdAlreadyRegistered {
                id: self.arg_ref_id(arg),
                owner: self.groups[group.0].id().to_string(),
            });
        }
        self.groups[group.0].arguments.push(arg);
        Ok(())
    }

    // --- CONFLICTS ---

    /// Marks two arguments as mutually exclusive. Conflicts are transitive:
    /// the two arguments end up in one shared set, merged if each already
    /// belonged to a different set.
    pub fn add_conflict_argument(&mut self, a: ArgRef, b: ArgRef) {
        match (self.conflict_group_of(a), self.conflict_group_of(b)) {
            (None, None) => {
                self.conflict_groups.push(vec![a, b]);
                let group = ConflictGroupId(self.conflict_groups.len() - 1);
                self.set_conflict_group(a, group);
                self.set_conflict_group(b, group);
            }
            (Some(group), None) => {
                self.conflict_groups[group.0].push(b);
                self.set_conflict_group(b, group);
            }
            (None, Some(group)) => {
                self.conflict_groups[group.0].push(a);
                self.set_conflict_group(a, group);
            }
            (Some(keep), Some(merge)) if keep != merge => {
                let members = std::mem::take(&mut self.conflict_groups[merge.0]);
                for member in members {
                    self.set_conflict_group(member, keep);
                    self.conflict_groups[keep.0].push(member);
                }
            }
            _ => {}
        }
    }

    /// Marks every pair from `args` as mutually exclusive.
    pub fn add_conflict_arguments(&mut self, args: &[ArgRef]) {
        for pair in args.windows(2) {
            self.add_conflict_argument(pair[0], pair[1]);
        }
    }

    /// Finds an already-parsed member of `arg`'s conflict set, if any.
    pub fn conflicting_argument(&self, arg: ArgRef) -> Option<ArgRef> {
        let group = self.conflict_group_of(arg)?;
        self.conflict_groups[group.0]
            .iter()
            .copied()
            .find(|&other| other != arg && self.parse_count_of(other) > 0)
    }

    fn conflict_group_of(&self, arg: ArgRef) -> Option<ConflictGroupId> {
        self.base_of(arg).conflict_group
    }

    fn set_conflict_group(&mut self, arg: ArgRef, group: ConflictGroupId) {
        self.base_of_mut(arg).conflict_group = Some(group);
    }

    fn parse_count_of(&self, arg: ArgRef) -> u32 {
        self.base_of(arg).parse_count
    }

    fn base_of(&self, arg: ArgRef) -> &ArgData {
        match arg {
            ArgRef::Command(c) => &self.cmds[c.0].base,
            ArgRef::Named(n) => &self.named_args[n.0].base,
            ArgRef::Positional(p) => &self.positional_args[p.0].base,
        }
    }

    fn base_of_mut(&mut self, arg: ArgRef) -> &mut ArgData {
        match arg {
            ArgRef::Command(c) => &mut self.cmds[c.0].base,
            ArgRef::Named(n) => &mut self.named_args[n.0].base,
            ArgRef::Positional(p) => &mut self.positional_args[p.0].base,
        }
    }

    fn arg_ref_id(&self, arg: ArgRef) -> String {
        self.base_of(arg).id.clone()
    }

    /// The diagnostic label of an argument, e.g. `named argument "--all"`.
    fn conflict_label(&self, arg: ArgRef) -> String {
        match arg {
            ArgRef::Command(c) => format!("command \"{}\"", self.cmds[c.0].id()),
            ArgRef::Named(n) => {
                format!("named argument \"{}\"", self.named_args[n.0].display_name())
            }
            ArgRef::Positional(p) => {
                format!("positional argument \"{}\"", self.positional_args[p.0].id())
            }
        }
    }

    // --- LOOKUP ---

    /// Resolves an alias command to its target, following chains.
    pub(crate) fn effective(&self, mut cmd: CommandId) -> CommandId {
        while let Some(attached) = self.cmds[cmd.0].attached_command {
            cmd = attached;
        }
        cmd
    }

    /// Finds a command by dotted id path relative to the root. An empty path
    /// names the root itself.
    pub fn get_command(&self, id_path: &str) -> ParserResult<CommandId> {
        let root = self.root.ok_or(ArgumentParserError::RootCommandNotSet)?;
        if id_path.is_empty() {
            return Ok(root);
        }
        let mut cur = root;
        for segment in id_path.split('.') {
            let eff = self.effective(cur);
            cur = self.cmds[eff.0]
                .commands
                .iter()
                .copied()
                .find(|&c| self.cmds[c.0].id() == segment)
                .ok_or_else(|| ArgumentParserError::NotFound(id_path.to_string()))?;
        }
        Ok(cur)
    }

    /// Finds a named argument by dotted id path. With `search_in_parent`,
    /// every command along the path is searched and the deepest match wins.
    pub fn get_named_arg(&self, id_path: &str, search_in_parent: bool) -> ParserResult<NamedArgId> {
        let root = self.root.ok_or(ArgumentParserError::RootCommandNotSet)?;
        let (cmd_path, name) = match id_path.rsplit_once('.') {
            Some((path, name)) => (path, name),
            None => ("", id_path),
        };
        let mut cur = root;
        let mut found = None;
        if !cmd_path.is_empty() {
            for segment in cmd_path.split('.') {
                if search_in_parent {
                    if let Some(arg) = self.find_named_in(cur, name) {
                        found = Some(arg);
                    }
                }
                let eff = self.effective(cur);
                cur = self.cmds[eff.0]
                    .commands
                    .iter()
                    .copied()
                    .find(|&c| self.cmds[c.0].id() == segment)
                    .ok_or_else(|| ArgumentParserError::NotFound(id_path.to_string()))?;
            }
        }
        if let Some(arg) = self.find_named_in(cur, name) {
            return Ok(arg);
        }
        found.ok_or_else(|| ArgumentParserError::NotFound(id_path.to_string()))
    }

    /// Positional counterpart of [`ArgumentParser::get_named_arg`].
    pub fn get_positional_arg(
        &self,
        id_path: &str,
        search_in_parent: bool,
    ) -> ParserResult<PositionalArgId> {
        let root = self.root.ok_or(ArgumentParserError::RootCommandNotSet)?;
        let (cmd_path, name) = match id_path.rsplit_once('.') {
            Some((path, name)) => (path, name),
            None => ("", id_path),
        };
        let mut cur = root;
        let mut found = None;
        if !cmd_path.is_empty() {
            for segment in cmd_path.split('.') {
                if search_in_parent {
                    if let Some(arg) = self.find_positional_in(cur, name) {
                        found = Some(arg);
                    }
                }
                let eff = self.effective(cur);
                cur = self.cmds[eff.0]
                    .commands
                    .iter()
                    .copied()
                    .find(|&c| self.cmds[c.0].id() == segment)
                    .ok_or_else(|| ArgumentParserError::NotFound(id_path.to_string()))?;
            }
        }
        if let Some(arg) = self.find_positional_in(cur, name) {
            return Ok(arg);
        }
        found.ok_or_else(|| ArgumentParserError::NotFound(id_path.to_string()))
    }

    fn find_named_in(&self, cmd: CommandId, id: &str) -> Option<NamedArgId> {
        let eff = self.effective(cmd);
        self.cmds[eff.0]
            .named_args
            .iter()
            .copied()
            .find(|&a| self.named_args[a.0].id() == id)
    }

    fn find_positional_in(&self, cmd: CommandId, id: &str) -> Option<PositionalArgId> {
        let eff = self.effective(cmd);
        self.cmds[eff.0]
            .positional_args
            .iter()
            .copied()
            .find(|&a| self.positional_args[a.0].id() == id)
    }

    /// Zeroes every node's parse counter so the tree can be parsed again.
    pub fn reset_parse_count(&mut self) {
        for cmd in &mut self.cmds {
            cmd.base.parse_count = 0;
        }
        for arg in &mut self.named_args {
            arg.base.parse_count = 0;
        }
        for arg in &mut self.positional_args {
            arg.base.parse_count = 0;
        }
        self.selected = None;
    }

    // --- PARSING ---

    /// Parses a complete command line. `args[0]` is the program name; it
    /// selects the root command.
    pub fn parse(&mut self, args: &[String]) -> ParserResult<()> {
        let root = self.root.ok_or(ArgumentParserError::RootCommandNotSet)?;
        self.selected = Some(root);
        let option = args.first().cloned().unwrap_or_default();
        self.parse_command(root, &option, args, 0)
    }

    /// Parses `args` up to token `complete_arg_idx` and returns completion
    /// candidates for that token. Parse errors are swallowed; command hooks
    /// do not run. Index 0 is the program name and cannot be completed.
    pub fn complete(&mut self, args: &[String], complete_arg_idx: usize) -> Vec<String> {
        if complete_arg_idx == 0 || complete_arg_idx >= args.len() {
            return Vec::new();
        }
        self.completion = Some(Completion {
            target: complete_arg_idx,
            candidates: Vec::new(),
        });
        let _ = self.parse(args);
        match self.completion.take() {
            Some(done) => done.candidates,
            None => Vec::new(),
        }
    }

    /// Parses the token run belonging to one command. `args[0]` is the token
    /// that selected the command, `base` its absolute index in the original
    /// command line.
    fn parse_command(
        &mut self,
        cmd: CommandId,
        option: &str,
        args: &[String],
        base: usize,
    ) -> ParserResult<()> {
        let eff = self.effective(cmd);

        // an alias fires its attached named arguments before its own tokens
        let alias_attached = self.cmds[cmd.0].attached_named_args.clone();
        if !alias_attached.is_empty() {
            self.fire_attached(option, "", &alias_attached)?;
        }

        let named_list = self.visible_named_args(cmd);
        let positionals = self.cmds[eff.0].positional_args.clone();
        let mut used_positionals = 0usize;
        let mut short_idx = 0usize;
        let mut i = 1usize;

        while i < args.len() {
            if let Some(completion) = &self.completion {
                let abs = base + i;
                if abs > completion.target {
                    return Ok(());
                }
                if abs == completion.target {
                    let token = args[i].clone();
                    self.collect_completions(eff, &token, &named_list, &positionals[used_positionals.min(positionals.len())..]);
                    return Ok(());
                }
            }

            let token = args[i].clone();
            let mut used = false;

            if let Some(after_dash) = token.strip_prefix('-') {
                if let Some(body) = after_dash.strip_prefix('-') {
                    // long option, possibly with an inline =value
                    let name = body.split('=').next().unwrap_or(body);
                    if !name.is_empty() {
                        if let Some(arg) = named_list
                            .iter()
                            .copied()
                            .find(|&a| self.named_args[a.0].long_name() == name)
                        {
                            i += self.parse_long(arg, body, &args[i..])?;
                            used = true;
                        }
                    }
                } else if !after_dash.is_empty() {
                    // short option bundle; a mid-bundle flag consumes nothing
                    let mut indices = after_dash.char_indices().skip(short_idx);
                    if let Some((pos, short)) = indices.next() {
                        if let Some(arg) = named_list
                            .iter()
                            .copied()
                            .find(|&a| self.named_args[a.0].short_name() == Some(short))
                        {
                            let remainder = after_dash[pos + short.len_utf8()..].to_string();
                            let consumed = self.parse_short(arg, short, &remainder, &args[i..])?;
                            if consumed > 0 {
                                i += consumed;
                                short_idx = 0;
                            } else {
                                short_idx += 1;
                            }
                            used = true;
                        }
                    }
                }
            }

            if !used {
                if let Some(sub) = self.cmds[eff.0]
                    .commands
                    .iter()
                    .copied()
                    .find(|&c| self.cmds[c.0].id() == token)
                {
                    if let Some(conflict) = self.conflicting_argument(ArgRef::Command(sub)) {
                        return Err(ArgumentParserError::ConflictingArguments {
                            option: token,
                            conflict: self.conflict_label(conflict),
                        });
                    }
                    self.selected = Some(sub);
                    self.parse_command(sub, &token, &args[i..], base + i)?;
                    if self.completion.is_some() {
                        return Ok(());
                    }
                    i = args.len();
                    used = true;
                }
            }

            if !used && !token.starts_with('-') && used_positionals < positionals.len() {
                let pos = positionals[used_positionals];
                let command = self.cmds[eff.0].id().to_string();
                let consumed = self.parse_positional(pos, &command, &args[i..], base + i)?;
                i += consumed;
                // open-ended positionals stay current and keep accumulating
                match self.positional_args[pos.0].arity {
                    Arity::Exact(_) | Arity::Optional => used_positionals += 1,
                    Arity::Unlimited | Arity::AtLeastOne => {}
                }
                used = true;
            }

            if !used {
                return Err(ArgumentParserError::UnknownArgument {
                    argument: token,
                    command: self.cmds[eff.0].id().to_string(),
                });
            }
        }

        if self.completion.is_some() {
            return Ok(());
        }

        // a command with a required positional that never fired is incomplete
        for &pos in &positionals {
            let arg = &self.positional_args[pos.0];
            let required = matches!(arg.arity, Arity::AtLeastOne) || matches!(arg.arity, Arity::Exact(n) if n > 0);
            if required && arg.base.parse_count == 0 {
                return Err(ArgumentParserError::FewValues {
                    id: arg.id().to_string(),
                    command: self.cmds[eff.0].id().to_string(),
                });
            }
        }

        self.cmds[cmd.0].base.parse_count += 1;

        let hook = self.cmds[eff.0].parse_hook.clone();
        if let Some(hook) = hook {
            hook(option, args)?;
        }
        Ok(())
    }

    /// Named arguments recognized while parsing `cmd`: its own plus, when
    /// inheritance is enabled, those of every ancestor.
    fn visible_named_args(&self, cmd: CommandId) -> Vec<NamedArgId> {
        let eff = self.effective(cmd);
        let mut list = self.cmds[eff.0].named_args.clone();
        if self.inherit_named_args {
            let mut cur = self.cmds[cmd.0].parent;
            while let Some(ancestor) = cur {
                let ancestor_eff = self.effective(ancestor);
                list.extend(self.cmds[ancestor_eff.0].named_args.iter().copied());
                cur = self.cmds[ancestor.0].parent;
            }
        }
        list
    }

    /// Handles `--name` and `--name=value`. `body` is the token without the
    /// leading dashes; `rest[0]` is the token itself. Returns how many tokens
    /// were consumed.
    fn parse_long(&mut self, id: NamedArgId, body: &str, rest: &[String]) -> ParserResult<usize> {
        let (name, inline_value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        let option = format!("--{name}");
        let has_value = self.named_args[id.0].has_value;
        let (value, consumed) = if has_value {
            match inline_value {
                Some(value) => (value.to_string(), 1),
                None => match rest.get(1) {
                    Some(next) => (next.clone(), 2),
                    None => return Err(ArgumentParserError::MissingValue(option)),
                },
            }
        } else {
            if inline_value.is_some() {
                return Err(ArgumentParserError::ValueNotExpected(option));
            }
            (String::new(), 1)
        };
        self.invoke_named(id, &option, &value)?;
        Ok(consumed)
    }

    /// Handles one character of a short-option bundle. `remainder` is the
    /// bundle text after `short`; a value-taking option swallows it as its
    /// value, a flag followed by more bundle characters consumes no token.
    fn parse_short(
        &mut self,
        id: NamedArgId,
        short: char,
        remainder: &str,
        rest: &[String],
    ) -> ParserResult<usize> {
        let option = format!("-{short}");
        let has_value = self.named_args[id.0].has_value;
        let (value, consumed) = if has_value {
            if !remainder.is_empty() {
                (remainder.to_string(), 1)
            } else if let Some(next) = rest.get(1) {
                (next.clone(), 2)
            } else {
                return Err(ArgumentParserError::MissingValue(option));
            }
        } else {
            (String::new(), if remainder.is_empty() { 1 } else { 0 })
        };
        self.invoke_named(id, &option, &value)?;
        Ok(consumed)
    }

    /// Common tail of every named-argument hit: conflict check, value store,
    /// parse hook and attached arguments. `value` is ignored for flags.
    fn invoke_named(&mut self, id: NamedArgId, option: &str, value: &str) -> ParserResult<()> {
        if let Some(conflict) = self.conflicting_argument(ArgRef::Named(id)) {
            return Err(ArgumentParserError::ConflictingArguments {
                option: option.to_string(),
                conflict: self.conflict_label(conflict),
            });
        }
        let (store, has_value, const_value, hook, attached) = {
            let arg = &self.named_args[id.0];
            (
                arg.store_value,
                arg.has_value,
                arg.const_value.clone(),
                arg.parse_hook.clone(),
                arg.attached_named_args.clone(),
            )
        };
        let stored = if has_value {
            value.to_string()
        } else {
            const_value
        };
        if store {
            let target = self.named_args[id.0].value_target.unwrap_or(id);
            self.named_args[target.0].value = Some(stored.clone());
        }
        self.named_args[id.0].base.parse_count += 1;
        if let Some(hook) = hook {
            hook(option, &stored)?;
        }
        if !attached.is_empty() {
            self.fire_attached(option, &stored, &attached)?;
        }
        Ok(())
    }

    /// Fires a list of attached named arguments on behalf of `option`. The
    /// `${}` placeholder in an attached value is replaced by `arg_value`.
    fn fire_attached(
        &mut self,
        option: &str,
        arg_value: &str,
        attached: &[AttachedNamedArg],
    ) -> ParserResult<()> {
        for att in attached {
            let target = self.get_named_arg(&att.id_path, false)?;
            let value = att.value.replace("${}", arg_value);
            self.invoke_named(target, option, &value)?;
        }
        Ok(())
    }

    /// Consumes tokens for one positional argument. `rest[0]` is the first
    /// candidate token (never option-like), `abs` its absolute index.
    fn parse_positional(
        &mut self,
        id: PositionalArgId,
        command: &str,
        rest: &[String],
        abs: usize,
    ) -> ParserResult<usize> {
        if let Some(conflict) = self.conflicting_argument(ArgRef::Positional(id)) {
            return Err(ArgumentParserError::ConflictingArguments {
                option: rest[0].clone(),
                conflict: self.conflict_label(conflict),
            });
        }
        let usable = rest.iter().take_while(|t| !t.starts_with('-')).count();
        let arity = self.positional_args[id.0].arity;
        let count = match arity {
            Arity::Exact(n) => {
                if usable < n {
                    return Err(ArgumentParserError::FewValues {
                        id: self.positional_args[id.0].id().to_string(),
                        command: command.to_string(),
                    });
                }
                n
            }
            Arity::Optional => 1,
            Arity::Unlimited | Arity::AtLeastOne => usable,
        };

        if let Some(completion) = &self.completion {
            let target = completion.target;
            if (abs..abs + count).contains(&target) {
                let token = rest[target - abs].clone();
                let hook = self.positional_args[id.0].complete_hook.clone();
                let complete = self.positional_args[id.0].base.complete;
                if complete {
                    if let Some(hook) = hook {
                        let mut candidates = hook(&token);
                        candidates.sort();
                        candidates.dedup();
                        if candidates.len() == 1 && candidates[0] == token {
                            candidates.clear();
                        }
                        if let Some(completion) = &mut self.completion {
                            completion.candidates = candidates;
                        }
                    }
                }
                return Ok(count);
            }
        }

        let (store, hook) = {
            let arg = &self.positional_args[id.0];
            (arg.store_value, arg.parse_hook.clone())
        };
        if store {
            if self.positional_args[id.0].base.parse_count == 0 {
                self.positional_args[id.0].values.clear();
            }
            self.positional_args[id.0]
                .values
                .extend_from_slice(&rest[..count]);
        }
        self.positional_args[id.0].base.parse_count += 1;
        if let Some(hook) = hook {
            hook(&rest[..count])?;
        }
        Ok(count)
    }

    /// Gathers completion candidates for `token` in the context of `cmd`.
    fn collect_completions(
        &mut self,
        cmd: CommandId,
        token: &str,
        named_list: &[NamedArgId],
        remaining_positionals: &[PositionalArgId],
    ) {
        let mut candidates = Vec::new();
        if token.starts_with('-') {
            for &id in named_list {
                let arg = &self.named_args[id.0];
                if !arg.base.complete {
                    continue;
                }
                if let Some(short) = arg.short_name() {
                    let form = format!("-{short}");
                    if token == "-" || token == form {
                        candidates.push(form);
                    }
                }
                if !arg.long_name().is_empty() {
                    let form = if arg.has_value() {
                        format!("--{}=", arg.long_name())
                    } else {
                        format!("--{}", arg.long_name())
                    };
                    if form.starts_with(token) {
                        candidates.push(form);
                    }
                }
            }
        } else {
            let mut command_matched = false;
            for &sub in &self.cmds[cmd.0].commands {
                let child = &self.cmds[sub.0];
                if child.base.complete && child.id().starts_with(token) {
                    candidates.push(child.id().to_string());
                    command_matched = true;
                }
            }
            if !command_matched {
                if let Some(&pos) = remaining_positionals.first() {
                    let arg = &self.positional_args[pos.0];
                    if arg.base.complete {
                        if let Some(hook) = arg.complete_hook.clone() {
                            candidates.extend(hook(token));
                        }
                    }
                }
            }
        }
        candidates.sort();
        candidates.dedup();
        if candidates.len() == 1 {
            if candidates[0] == token {
                candidates.clear();
            } else if !candidates[0].ends_with('=') {
                candidates[0].push(' ');
            }
        }
        if let Some(completion) = &mut self.completion {
            completion.candidates = candidates;
        }
    }
}

fn check_id(id: &str) -> ParserResult<()> {
    if id.contains('.') {
        return Err(ArgumentParserError::InvalidId(id.to_string()));
    }
    Ok(())
}
