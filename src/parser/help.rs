// src/parser/help.rs

//! Plain-text help output for a command and its arguments.

use crate::parser::node::{ArgRef, CommandId, GroupId, NamedArgId, PositionalArgId};
use crate::parser::ArgumentParser;

impl ArgumentParser {
    /// Renders the help text of `cmd`: a usage line followed by subcommand,
    /// option and argument sections. Grouped arguments appear under their
    /// group header, the rest under the command's default headers.
    pub fn help(&self, cmd: CommandId) -> String {
        let eff = self.effective(cmd);
        let command = self.cmd(eff);
        let mut out = String::new();

        let about = if command.long_description().is_empty() {
            command.description()
        } else {
            command.long_description()
        };
        if !about.is_empty() {
            out.push_str(about);
            out.push_str("\n\n");
        }

        out.push_str("Usage:\n  ");
        out.push_str(&self.usage_line(cmd));
        out.push('\n');

        let groups = command.groups.clone();

        // subcommands
        let mut grouped: Vec<CommandId> = Vec::new();
        for &group in &groups {
            let members = self.group_commands(group);
            grouped.extend(members.iter().copied());
            self.push_section(&mut out, self.groups[group.0].header(), &self.command_rows(&members));
        }
        let rest: Vec<CommandId> = command
            .commands
            .iter()
            .copied()
            .filter(|c| !grouped.contains(c))
            .collect();
        self.push_section(&mut out, &command.commands_help_header, &self.command_rows(&rest));

        // named arguments
        let mut grouped: Vec<NamedArgId> = Vec::new();
        for &group in &groups {
            let members = self.group_named_args(group);
            grouped.extend(members.iter().copied());
            self.push_section(&mut out, self.groups[group.0].header(), &self.named_rows(&members));
        }
        let rest: Vec<NamedArgId> = command
            .named_args
            .iter()
            .copied()
            .filter(|a| !grouped.contains(a))
            .collect();
        self.push_section(&mut out, &command.named_args_help_header, &self.named_rows(&rest));

        // positional arguments
        let mut grouped: Vec<PositionalArgId> = Vec::new();
        for &group in &groups {
            let members = self.group_positional_args(group);
            grouped.extend(members.iter().copied());
            self.push_section(&mut out, self.groups[group.0].header(), &self.positional_rows(&members));
        }
        let rest: Vec<PositionalArgId> = command
            .positional_args
            .iter()
            .copied()
            .filter(|a| !grouped.contains(a))
            .collect();
        self.push_section(
            &mut out,
            &command.positional_args_help_header,
            &self.positional_rows(&rest),
        );

        out
    }

    /// The invocation synopsis, built from the ancestor chain down to `cmd`.
    fn usage_line(&self, cmd: CommandId) -> String {
        let mut chain = vec![cmd];
        let mut cur = self.cmd(cmd).parent;
        while let Some(parent) = cur {
            chain.push(parent);
            cur = self.cmd(parent).parent;
        }
        chain.reverse();

        let mut parts = Vec::new();
        for (depth, &link) in chain.iter().enumerate() {
            let eff = self.effective(link);
            parts.push(self.cmd(link).id().to_string());
            if !self.cmd(eff).named_args.is_empty() {
                parts.push(if depth == 0 {
                    "[GLOBAL OPTIONS]".to_string()
                } else {
                    "[OPTIONS]".to_string()
                });
            }
        }
        let eff = self.effective(cmd);
        if !self.cmd(eff).commands.is_empty() {
            parts.push("<COMMAND>".to_string());
        }
        if !self.cmd(eff).positional_args.is_empty() {
            parts.push("[ARGUMENTS]".to_string());
        }
        parts.join(" ")
    }

    /// The option names column for one named argument, e.g. `-g, --global=VALUE`.
    pub fn named_arg_names(&self, id: NamedArgId) -> String {
        let arg = self.named_arg(id);
        let mut out = String::new();
        if let Some(short) = arg.short_name() {
            out.push('-');
            out.push(short);
        }
        if !arg.long_name().is_empty() {
            if !out.is_empty() {
                out.push_str(", ");
            }
            out.push_str("--");
            out.push_str(arg.long_name());
        }
        if arg.has_value() {
            out.push('=');
            if arg.value_help.is_empty() {
                out.push_str("VALUE");
            } else {
                out.push_str(&arg.value_help);
            }
        }
        out
    }

    fn group_commands(&self, group: GroupId) -> Vec<CommandId> {
        self.groups[group.0]
            .arguments
            .iter()
            .filter_map(|r| match r {
                ArgRef::Command(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    fn group_named_args(&self, group: GroupId) -> Vec<NamedArgId> {
        self.groups[group.0]
            .arguments
            .iter()
            .filter_map(|r| match r {
                ArgRef::Named(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    fn group_positional_args(&self, group: GroupId) -> Vec<PositionalArgId> {
        self.groups[group.0]
            .arguments
            .iter()
            .filter_map(|r| match r {
                ArgRef::Positional(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn command_rows(&self, members: &[CommandId]) -> Vec<(String, String)> {
        members
            .iter()
            .map(|&c| {
                let cmd = self.cmd(c);
                (cmd.id().to_string(), cmd.description().to_string())
            })
            .collect()
    }

    fn named_rows(&self, members: &[NamedArgId]) -> Vec<(String, String)> {
        members
            .iter()
            .map(|&a| {
                (
                    self.named_arg_names(a),
                    self.named_arg(a).description().to_string(),
                )
            })
            .collect()
    }

    fn positional_rows(&self, members: &[PositionalArgId]) -> Vec<(String, String)> {
        members
            .iter()
            .map(|&a| {
                let arg = self.positional_arg(a);
                (arg.id().to_string(), arg.description().to_string())
            })
            .collect()
    }

    fn push_section(&self, out: &mut String, header: &str, rows: &[(String, String)]) {
        if rows.is_empty() {
            return;
        }
        let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
        out.push('\n');
        out.push_str(header);
        out.push('\n');
        for (left, right) in rows {
            if right.is_empty() {
                out.push_str(&format!("  {left}\n"));
            } else {
                out.push_str(&format!("  {left:<width$}  {right}\n"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{ArgRef, ArgumentParser, Arity};

    #[test]
    fn help_lists_sections_in_order() {
        let mut parser = ArgumentParser::new();
        let root = parser.add_new_command("pkgtool").unwrap();
        parser
            .cmd_mut(root)
            .set_description("Utility for packages");
        parser.set_root_command(root);

        let help = parser.add_new_named_arg("help").unwrap();
        parser
            .named_arg_mut(help)
            .set_long_name("help")
            .set_short_name('h')
            .set_description("Print help");
        parser.register_named_arg(root, help).unwrap();

        let install = parser.add_new_command("install").unwrap();
        parser.cmd_mut(install).set_description("Install packages");
        parser.register_command(root, install).unwrap();

        let text = parser.help(root);
        assert!(text.starts_with("Utility for packages\n"));
        assert!(text.contains("Usage:\n  pkgtool [GLOBAL OPTIONS]"));
        assert!(text.contains("Commands:\n  install  Install packages\n"));
        assert!(text.contains("Options:\n  -h, --help  Print help\n"));
    }

    #[test]
    fn usage_line_chains_ancestors() {
        let mut parser = ArgumentParser::new();
        let root = parser.add_new_command("pkgtool").unwrap();
        parser.set_root_command(root);
        let help = parser.add_new_named_arg("help").unwrap();
        parser.named_arg_mut(help).set_long_name("help");
        parser.register_named_arg(root, help).unwrap();

        let install = parser.add_new_command("install").unwrap();
        parser.register_command(root, install).unwrap();
        let keys = parser
            .add_new_positional_arg("keys", Arity::AtLeastOne)
            .unwrap();
        parser.register_positional_arg(install, keys).unwrap();

        let text = parser.help(install);
        assert!(
            text.contains("Usage:\n  pkgtool [GLOBAL OPTIONS] install [ARGUMENTS]"),
            "unexpected usage in:\n{text}"
        );
    }

    #[test]
    fn grouped_options_use_group_header() {
        let mut parser = ArgumentParser::new();
        let root = parser.add_new_command("pkgtool").unwrap();
        parser.set_root_command(root);

        let quiet = parser.add_new_named_arg("quiet").unwrap();
        parser
            .named_arg_mut(quiet)
            .set_long_name("quiet")
            .set_description("Less output");
        parser.register_named_arg(root, quiet).unwrap();

        let group = parser.add_new_group("output");
        parser.group_mut(group).set_header("Output options:");
        parser.register_group(root, group).unwrap();
        parser
            .group_register_argument(group, ArgRef::Named(quiet))
            .unwrap();

        let text = parser.help(root);
        assert!(text.contains("Output options:\n  --quiet  Less output\n"));
        assert!(!text.contains("Options:\n"));
    }

    #[test]
    fn named_arg_names_include_value_help() {
        let mut parser = ArgumentParser::new();
        let arg = parser.add_new_named_arg("setopt").unwrap();
        parser
            .named_arg_mut(arg)
            .set_long_name("setopt")
            .set_has_value(true)
            .set_value_help("KEY=VALUE");
        assert_eq!(parser.named_arg_names(arg), "--setopt=KEY=VALUE");
    }
}
