// src/aliases.rs

//! Loader for user-defined command aliases.
//!
//! Alias definition files are TOML documents that graft new entries onto an
//! existing argument tree: whole alias commands, cloned named arguments,
//! standalone named arguments and help groups. Files are applied in sorted
//! path order so later files can rely on entries from earlier ones. A broken
//! entry is reported and skipped; the rest of the file still loads.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;

use crate::constants::{ALIASES_FILE_EXTENSION, ALIASES_FILE_VERSION};
use crate::parser::{ArgRef, ArgumentParser, CommandId, GroupId};

/// Loads every `*.conf` file from `dir` in sorted order. A missing or
/// unreadable directory is not an error; alias directories are optional.
pub fn load_aliases_from_dir(parser: &mut ArgumentParser, dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext == ALIASES_FILE_EXTENSION)
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    for path in paths {
        load_aliases_from_file(parser, &path);
    }
}

/// Loads one alias definition file. Reports and skips the whole file on a
/// read failure, a TOML syntax error or a version mismatch; reports and
/// skips single entries on per-entry errors.
pub fn load_aliases_from_file(parser: &mut ArgumentParser, path: &Path) {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            print_and_log_error(&format!(
                "Unable to read aliases file \"{}\": {err}",
                path.display()
            ));
            return;
        }
    };
    let table: toml::Table = match text.parse() {
        Ok(table) => table,
        Err(err) => {
            print_and_log_error(&format!(
                "Error parsing aliases file \"{}\": {err}",
                path.display()
            ));
            return;
        }
    };

    match table.get("version") {
        Some(toml::Value::String(version)) if version == ALIASES_FILE_VERSION => {}
        Some(toml::Value::String(version)) => {
            print_and_log_error(&format!(
                "Unsupported version \"{version}\" of aliases file \"{}\", \
                 only version \"{ALIASES_FILE_VERSION}\" is supported",
                path.display()
            ));
            return;
        }
        Some(_) => {
            print_and_log_error(&format!(
                "Invalid value type of attribute \"version\" in aliases file \"{}\"",
                path.display()
            ));
            return;
        }
        None => {
            print_and_log_error(&format!(
                "Missing attribute \"version\" in aliases file \"{}\"",
                path.display()
            ));
            return;
        }
    }

    for (element_id_path, value) in &table {
        if element_id_path == "version" {
            continue;
        }
        let Some(options) = value.as_table() else {
            log::warn!(
                "Unknown key \"{element_id_path}\" in aliases file \"{}\"",
                path.display()
            );
            continue;
        };
        if let Err(err) = load_element(parser, path, element_id_path, options) {
            print_and_log_error(&format!(
                "Error in aliases file \"{}\", element \"{element_id_path}\": {err:#}",
                path.display()
            ));
        }
    }
}

/// Creates one tree entry from its TOML table.
fn load_element(
    parser: &mut ArgumentParser,
    path: &Path,
    element_id_path: &str,
    options: &toml::Table,
) -> Result<()> {
    let (parent_path, element_id) = match element_id_path.rsplit_once('.') {
        Some((parent, id)) => (parent, id),
        None => ("", element_id_path),
    };
    if element_id.is_empty() {
        bail!("empty element id");
    }
    let parent = parser
        .get_command(parent_path)
        .map_err(|_| anyhow!("parent command \"{parent_path}\" not found"))?;

    let element_type = options
        .get("type")
        .ok_or_else(|| anyhow!("missing attribute \"type\""))?
        .as_str()
        .ok_or_else(|| anyhow!("invalid value type of attribute \"type\""))?;

    match element_type {
        "group" => load_group(parser, path, element_id_path, element_id, parent, options),
        "cloned_named_arg" => {
            load_cloned_named_arg(parser, path, element_id_path, element_id, parent, options)
        }
        "named_arg" => load_named_arg(parser, path, element_id_path, element_id, parent, options),
        "command" => load_command(parser, path, element_id_path, element_id, parent, options),
        other => bail!("unknown element type \"{other}\""),
    }
}

/// `type = "group"`: a help group of the parent command. Re-declaring an
/// existing group is allowed and leaves the original untouched.
fn load_group(
    parser: &mut ArgumentParser,
    path: &Path,
    element_id_path: &str,
    element_id: &str,
    parent: CommandId,
    options: &toml::Table,
) -> Result<()> {
    let mut header = None;
    for (key, value) in options {
        match key.as_str() {
            "type" => {}
            "header" => {
                header = Some(string_attribute(value, "header")?);
            }
            unknown => warn_unknown_attribute(path, element_id_path, unknown),
        }
    }
    if find_group(parser, parent, element_id).is_some() {
        return Ok(());
    }
    let header = header.ok_or_else(|| anyhow!("missing attribute \"header\""))?;
    let group = parser.add_new_group(element_id);
    parser.group_mut(group).set_header(&header);
    parser
        .register_group(parent, group)
        .map_err(|err| anyhow!("{err}"))?;
    Ok(())
}

/// `type = "cloned_named_arg"`: a renamed clone of an existing named
/// argument, sharing its behavior and value slot.
fn load_cloned_named_arg(
    parser: &mut ArgumentParser,
    path: &Path,
    element_id_path: &str,
    element_id: &str,
    parent: CommandId,
    options: &toml::Table,
) -> Result<()> {
    let mut long_name = String::new();
    let mut short_name = None;
    let mut source = None;
    let mut group_id = None;
    let mut complete = None;
    for (key, value) in options {
        match key.as_str() {
            "type" => {}
            "long_name" => long_name = string_attribute(value, "long_name")?,
            "short_name" => short_name = Some(char_attribute(value, "short_name")?),
            "source" => source = Some(string_attribute(value, "source")?),
            "group_id" => group_id = Some(string_attribute(value, "group_id")?),
            "complete" => complete = Some(bool_attribute(value, "complete")?),
            unknown => warn_unknown_attribute(path, element_id_path, unknown),
        }
    }
    let source = source.ok_or_else(|| anyhow!("missing attribute \"source\""))?;
    if long_name.is_empty() && short_name.is_none() {
        bail!("at least one of the attributes \"long_name\" and \"short_name\" must be set");
    }
    let source = parser
        .get_named_arg(&source, false)
        .map_err(|_| anyhow!("source \"{source}\" not found"))?;
    let arg = parser
        .add_new_named_arg_alias(source, element_id, &long_name, short_name)
        .map_err(|err| anyhow!("{err}"))?;
    if let Some(complete) = complete {
        parser.named_arg_mut(arg).set_complete(complete);
    }
    if let Some(group_id) = group_id {
        let group = resolve_group(parser, parent, &group_id)?;
        parser
            .group_register_argument(group, ArgRef::Named(arg))
            .map_err(|err| anyhow!("{err}"))?;
    }
    parser
        .register_named_arg(parent, arg)
        .map_err(|err| anyhow!("{err}"))?;
    Ok(())
}

/// `type = "named_arg"`: a brand new named argument, usually driving other
/// arguments through `attached_named_args`.
fn load_named_arg(
    parser: &mut ArgumentParser,
    path: &Path,
    element_id_path: &str,
    element_id: &str,
    parent: CommandId,
    options: &toml::Table,
) -> Result<()> {
    let mut long_name = String::new();
    let mut short_name = None;
    let mut descr = String::new();
    let mut has_value = false;
    let mut value_help = String::new();
    let mut const_value = String::new();
    let mut group_id = None;
    let mut complete = None;
    let mut attached = Vec::new();
    for (key, value) in options {
        match key.as_str() {
            "type" => {}
            "long_name" => long_name = string_attribute(value, "long_name")?,
            "short_name" => short_name = Some(char_attribute(value, "short_name")?),
            "descr" => descr = string_attribute(value, "descr")?,
            "has_value" => has_value = bool_attribute(value, "has_value")?,
            "value_help" => value_help = string_attribute(value, "value_help")?,
            "const_value" => const_value = string_attribute(value, "const_value")?,
            "group_id" => group_id = Some(string_attribute(value, "group_id")?),
            "complete" => complete = Some(bool_attribute(value, "complete")?),
            "attached_named_args" => attached = attached_named_args(parser, value)?,
            unknown => warn_unknown_attribute(path, element_id_path, unknown),
        }
    }
    if long_name.is_empty() && short_name.is_none() {
        bail!("at least one of the attributes \"long_name\" and \"short_name\" must be set");
    }
    let arg = parser
        .add_new_named_arg(element_id)
        .map_err(|err| anyhow!("{err}"))?;
    {
        let node = parser.named_arg_mut(arg);
        node.set_long_name(&long_name)
            .set_description(&descr)
            .set_has_value(has_value)
            .set_value_help(&value_help)
            .set_const_value(&const_value)
            .set_complete(complete.unwrap_or(false));
        if let Some(short) = short_name {
            node.set_short_name(short);
        }
        for (id_path, value) in &attached {
            node.attach_named_arg(id_path, value);
        }
    }
    if let Some(group_id) = group_id {
        let group = resolve_group(parser, parent, &group_id)?;
        parser
            .group_register_argument(group, ArgRef::Named(arg))
            .map_err(|err| anyhow!("{err}"))?;
    }
    parser
        .register_named_arg(parent, arg)
        .map_err(|err| anyhow!("{err}"))?;
    Ok(())
}

/// `type = "command"`: an alias command forwarding to an existing command,
/// optionally firing named arguments first.
fn load_command(
    parser: &mut ArgumentParser,
    path: &Path,
    element_id_path: &str,
    element_id: &str,
    parent: CommandId,
    options: &toml::Table,
) -> Result<()> {
    let mut attached_command = None;
    let mut descr = String::new();
    let mut group_id = None;
    let mut complete = None;
    let mut attached = Vec::new();
    for (key, value) in options {
        match key.as_str() {
            "type" => {}
            "attached_command" => attached_command = Some(string_attribute(value, "attached_command")?),
            "descr" => descr = string_attribute(value, "descr")?,
            "group_id" => group_id = Some(string_attribute(value, "group_id")?),
            "complete" => complete = Some(bool_attribute(value, "complete")?),
            "attached_named_args" => attached = attached_named_args(parser, value)?,
            unknown => warn_unknown_attribute(path, element_id_path, unknown),
        }
    }
    let attached_command =
        attached_command.ok_or_else(|| anyhow!("missing attribute \"attached_command\""))?;
    let target = parser
        .get_command(&attached_command)
        .map_err(|_| anyhow!("attached command \"{attached_command}\" not found"))?;

    let alias = parser
        .add_new_command_alias(element_id, target)
        .map_err(|err| anyhow!("{err}"))?;
    {
        let node = parser.cmd_mut(alias);
        node.set_description(&descr)
            .set_complete(complete.unwrap_or(false));
        for (id_path, value) in &attached {
            node.attach_named_arg(id_path, value);
        }
    }
    if let Some(group_id) = group_id {
        let group = resolve_group(parser, parent, &group_id)?;
        parser
            .group_register_argument(group, ArgRef::Command(alias))
            .map_err(|err| anyhow!("{err}"))?;
    }
    parser
        .register_command(parent, alias)
        .map_err(|err| anyhow!("{err}"))?;
    Ok(())
}

/// Parses the `attached_named_args` attribute: an array of tables with an
/// `id_path` and an optional `value`. Every target must already exist.
fn attached_named_args(
    parser: &ArgumentParser,
    value: &toml::Value,
) -> Result<Vec<(String, String)>> {
    let list = value
        .as_array()
        .ok_or_else(|| anyhow!("invalid value type of attribute \"attached_named_args\""))?;
    let mut out = Vec::new();
    for item in list {
        let table = item
            .as_table()
            .ok_or_else(|| anyhow!("invalid element in \"attached_named_args\""))?;
        let id_path = table
            .get("id_path")
            .ok_or_else(|| anyhow!("missing attribute \"id_path\" in \"attached_named_args\""))?
            .as_str()
            .ok_or_else(|| anyhow!("invalid value type of attribute \"id_path\""))?;
        parser
            .get_named_arg(id_path, false)
            .with_context(|| format!("attached named argument \"{id_path}\" not found"))?;
        let attached_value = match table.get("value") {
            Some(value) => value
                .as_str()
                .ok_or_else(|| anyhow!("invalid value type of attribute \"value\""))?,
            None => "",
        };
        for key in table.keys() {
            if key != "id_path" && key != "value" {
                log::warn!("Unknown attribute \"{key}\" in \"attached_named_args\"");
            }
        }
        out.push((id_path.to_string(), attached_value.to_string()));
    }
    Ok(out)
}

fn resolve_group(parser: &ArgumentParser, parent: CommandId, group_id: &str) -> Result<GroupId> {
    find_group(parser, parent, group_id).ok_or_else(|| anyhow!("group \"{group_id}\" not found"))
}

fn find_group(parser: &ArgumentParser, parent: CommandId, group_id: &str) -> Option<GroupId> {
    parser
        .command_groups(parent)
        .into_iter()
        .find(|&g| parser.group(g).id() == group_id)
}

fn string_attribute(value: &toml::Value, name: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("invalid value type of attribute \"{name}\""))
}

fn bool_attribute(value: &toml::Value, name: &str) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| anyhow!("invalid value type of attribute \"{name}\""))
}

fn char_attribute(value: &toml::Value, name: &str) -> Result<char> {
    let text = string_attribute(value, name)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(anyhow!("attribute \"{name}\" must be one character")),
    }
}

fn warn_unknown_attribute(path: &Path, element_id_path: &str, attribute: &str) {
    log::warn!(
        "Unknown attribute \"{attribute}\" of element \"{element_id_path}\" in aliases file \"{}\"",
        path.display()
    );
}

fn print_and_log_error(message: &str) {
    log::error!("{message}");
    eprintln!("{}", message.red());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Arity;
    use std::io::Write;

    fn build_parser() -> (ArgumentParser, CommandId) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut parser = ArgumentParser::new();
        let root = parser.add_new_command("test").unwrap();
        parser.set_root_command(root);

        let yes = parser.add_new_named_arg("assumeyes").unwrap();
        parser
            .named_arg_mut(yes)
            .set_long_name("assumeyes")
            .set_short_name('y')
            .set_const_value("true");
        parser.register_named_arg(root, yes).unwrap();

        let upgrade = parser.add_new_command("upgrade").unwrap();
        parser.register_command(root, upgrade).unwrap();
        let keys = parser
            .add_new_positional_arg("keys", Arity::Unlimited)
            .unwrap();
        parser.register_positional_arg(upgrade, keys).unwrap();

        (parser, root)
    }

    fn write_conf(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".conf")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn version_one_file_adds_entries() {
        let (mut parser, _) = build_parser();
        let file = write_conf(
            r#"
version = "1.0"

["foo"]
type = "named_arg"
long_name = "foo"
descr = "Fancy option"
"#,
        );
        load_aliases_from_file(&mut parser, file.path());
        let foo = parser.get_named_arg("foo", false).unwrap();
        assert_eq!(parser.named_arg(foo).long_name(), "foo");
    }

    #[test]
    fn unsupported_version_skips_whole_file() {
        let (mut parser, _) = build_parser();
        let file = write_conf(
            r#"
version = "2.0"

["foo"]
type = "named_arg"
long_name = "foo"
"#,
        );
        load_aliases_from_file(&mut parser, file.path());
        assert!(parser.get_named_arg("foo", false).is_err());
    }

    #[test]
    fn missing_version_skips_whole_file() {
        let (mut parser, _) = build_parser();
        let file = write_conf("[\"foo\"]\ntype = \"named_arg\"\nlong_name = \"foo\"\n");
        load_aliases_from_file(&mut parser, file.path());
        assert!(parser.get_named_arg("foo", false).is_err());
    }

    #[test]
    fn broken_entry_does_not_poison_the_rest() {
        let (mut parser, _) = build_parser();
        let file = write_conf(
            r#"
version = "1.0"

["broken"]
type = "cloned_named_arg"
long_name = "broken"
source = "no-such-argument"

["up"]
type = "command"
attached_command = "upgrade"
descr = "Upgrade packages"
"#,
        );
        load_aliases_from_file(&mut parser, file.path());
        assert!(parser.get_named_arg("broken", false).is_err());
        let up = parser.get_command("up").unwrap();
        assert!(parser.cmd(up).is_alias());
    }

    #[test]
    fn command_alias_with_attached_named_arg_parses() {
        let (mut parser, _) = build_parser();
        let file = write_conf(
            r#"
version = "1.0"

["up-yes"]
type = "command"
attached_command = "upgrade"
attached_named_args = [{ id_path = "assumeyes" }]
"#,
        );
        load_aliases_from_file(&mut parser, file.path());
        let argv: Vec<String> = ["test", "up-yes", "pkg"].iter().map(|s| s.to_string()).collect();
        parser.parse(&argv).unwrap();
        let yes = parser.get_named_arg("assumeyes", false).unwrap();
        assert_eq!(parser.named_arg_value(yes), Some("true"));
    }

    #[test]
    fn cloned_named_arg_requires_a_name() {
        let (mut parser, _) = build_parser();
        let file = write_conf(
            r#"
version = "1.0"

["noname"]
type = "cloned_named_arg"
source = "assumeyes"
"#,
        );
        load_aliases_from_file(&mut parser, file.path());
        assert!(parser.get_named_arg("noname", false).is_err());
    }

    #[test]
    fn group_declaration_is_idempotent() {
        let (mut parser, root) = build_parser();
        let file = write_conf(
            r#"
version = "1.0"

["compat"]
type = "group"
header = "Compatibility options:"

["yes2"]
type = "cloned_named_arg"
long_name = "yes"
source = "assumeyes"
group_id = "compat"
"#,
        );
        load_aliases_from_file(&mut parser, file.path());
        load_aliases_from_file(&mut parser, file.path());
        let groups = parser.command_groups(root);
        assert_eq!(groups.len(), 1);
        assert_eq!(parser.group(groups[0]).header(), "Compatibility options:");
    }

    #[test]
    fn directory_loading_applies_files_in_sorted_order() {
        let (mut parser, _) = build_parser();
        let dir = tempfile::tempdir().unwrap();
        // the second file clones an argument defined by the first
        std::fs::write(
            dir.path().join("10-base.conf"),
            "version = \"1.0\"\n\n[\"refresh\"]\ntype = \"named_arg\"\nlong_name = \"refresh\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("20-extra.conf"),
            "version = \"1.0\"\n\n[\"refresh2\"]\ntype = \"cloned_named_arg\"\nlong_name = \"refresh2\"\nsource = \"refresh\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "not toml").unwrap();
        load_aliases_from_dir(&mut parser, dir.path());
        assert!(parser.get_named_arg("refresh", false).is_ok());
        assert!(parser.get_named_arg("refresh2", false).is_ok());
    }
}
