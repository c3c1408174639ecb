//! clap Command tree and command execution
//!
//! `openapi-explorer [--config F] [--spec URL] [--base-url URL] [--store PATH]
//! [--log-level L] <command>`. Commands write human-readable output to the
//! supplied writer; logs go to stderr.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use clap::{Arg, ArgAction, ArgMatches, Command};
use reqwest::blocking::Client;

use crate::auth::{ApiKeyLocation, AuthConfig, AuthStore};
use crate::config::{load_config, ExplorerConfig};
use crate::editor;
use crate::error::CliError;
use crate::explorer::Explorer;
use crate::form::{CustomFieldType, Field, FieldKind, InputType};
use crate::store::{self, KvStore};

/// Build the root command.
pub fn build_cli() -> Command {
    Command::new("openapi-explorer")
        .about("Explore an OpenAPI document: list endpoints, draft payloads and send requests")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("spec")
                .long("spec")
                .short('s')
                .global(true)
                .help("URL of the OpenAPI document"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .help("API base URL (derived from the spec URL when omitted)"),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .help("State file, or :memory: for a throwaway session"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("Log filter used when RUST_LOG is unset"),
        )
        .subcommand(Command::new("endpoints").about("List the endpoints in the document"))
        .subcommand(
            Command::new("form")
                .about("Show the form fields for an endpoint")
                .arg(endpoint_arg()),
        )
        .subcommand(
            Command::new("templates")
                .about("Show the payload templates for an endpoint")
                .arg(endpoint_arg()),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate JSON text")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .help("JSON text, @file, or - for stdin"),
                ),
        )
        .subcommand(build_send_command())
        .subcommand(build_auth_command())
}

fn endpoint_arg() -> Arg {
    Arg::new("endpoint")
        .required(true)
        .help("Endpoint id, e.g. GET-/pets")
}

fn build_send_command() -> Command {
    Command::new("send")
        .about("Send a request to an endpoint")
        .arg(endpoint_arg())
        .arg(
            Arg::new("template")
                .long("template")
                .short('t')
                .help("Start from a template: minimal, complete or example")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("json-body")
                .long("json")
                .short('j')
                .help("Replace the payload with a JSON object (text, @file or -)")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("field")
                .long("field")
                .short('f')
                .help("Set a field: key=value (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("custom")
                .long("custom")
                .help("Add a field the schema does not declare: key:type=value (repeatable)")
                .action(ArgAction::Append),
        )
}

fn build_auth_command() -> Command {
    Command::new("auth")
        .about("Show or change the persisted authentication")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("show").about("Show the active authentication"))
        .subcommand(Command::new("none").about("Disable authentication"))
        .subcommand(Command::new("clear").about("Reset authentication to none"))
        .subcommand(
            Command::new("bearer")
                .about("Send Authorization: Bearer <token>")
                .arg(Arg::new("token").required(true)),
        )
        .subcommand(
            Command::new("api-key")
                .about("Send an API key as a header or query parameter")
                .arg(Arg::new("key").required(true))
                .arg(Arg::new("value").required(true))
                .arg(
                    Arg::new("location")
                        .long("location")
                        .value_parser(["header", "query"])
                        .default_value("header"),
                ),
        )
        .subcommand(
            Command::new("basic")
                .about("Send HTTP Basic credentials")
                .arg(Arg::new("username").required(true))
                .arg(Arg::new("password").required(true)),
        )
}

/// Configuration file values with command-line overrides applied.
pub fn resolve_config(matches: &ArgMatches) -> Result<ExplorerConfig, CliError> {
    let path = matches.get_one::<String>("config").map(Path::new);
    let mut cfg = load_config(path)?;
    if let Some(spec) = matches.get_one::<String>("spec") {
        cfg.spec_url = spec.clone();
    }
    if let Some(base) = matches.get_one::<String>("base-url") {
        cfg.base_url = Some(base.clone());
    }
    if let Some(store) = matches.get_one::<String>("store") {
        cfg.store_path = store.clone();
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        cfg.logging.level = level.clone();
    }
    Ok(cfg)
}

/// Execute the selected subcommand.
pub fn run(cfg: &ExplorerConfig, matches: &ArgMatches, out: &mut dyn Write) -> Result<(), CliError> {
    match matches.subcommand() {
        Some(("validate", sub)) => {
            let input = sub
                .get_one::<String>("input")
                .map(String::as_str)
                .unwrap_or_default();
            run_validate(&read_input(input)?, out)
        }
        Some(("auth", sub)) => {
            let mut auth = AuthStore::load(store::open(&cfg.store_path)?);
            run_auth(&mut auth, sub, out)
        }
        Some((name, sub)) => {
            let mut explorer = open_explorer(cfg)?;
            explorer.load()?;
            match name {
                "endpoints" => run_endpoints(&explorer, out),
                "form" => {
                    select(&mut explorer, sub)?;
                    write_fields(out, &explorer.draft().form().render(), 0)
                }
                "templates" => {
                    select(&mut explorer, sub)?;
                    for t in explorer.draft().templates() {
                        writeln!(out, "== {} ({}) ==", t.name, t.label)?;
                        writeln!(out, "{}", editor::pretty(&t.data))?;
                    }
                    Ok(())
                }
                "send" => run_send(&mut explorer, sub, out),
                _ => Ok(()),
            }
        }
        None => Ok(()),
    }
}

fn open_explorer(cfg: &ExplorerConfig) -> Result<Explorer<Box<dyn KvStore>>, CliError> {
    let client = Client::builder().build().map_err(CliError::Client)?;
    let auth = AuthStore::load(store::open(&cfg.store_path)?);
    Ok(Explorer::new(
        client,
        auth,
        cfg.spec_url.clone(),
        cfg.base_url.clone(),
    ))
}

/// Select the endpoint named on the command line; ids match case-insensitively.
fn select<S: KvStore>(explorer: &mut Explorer<S>, sub: &ArgMatches) -> Result<(), CliError> {
    let wanted = sub
        .get_one::<String>("endpoint")
        .map(String::as_str)
        .unwrap_or_default();
    let id = explorer
        .endpoints()
        .iter()
        .find(|e| e.id == wanted)
        .or_else(|| {
            explorer
                .endpoints()
                .iter()
                .find(|e| e.id.eq_ignore_ascii_case(wanted))
        })
        .map(|e| e.id.clone())
        .ok_or_else(|| CliError::UnknownEndpoint {
            id: wanted.to_string(),
        })?;
    explorer.select(&id);
    Ok(())
}

fn run_endpoints<S: KvStore>(explorer: &Explorer<S>, out: &mut dyn Write) -> Result<(), CliError> {
    let width = explorer
        .endpoints()
        .iter()
        .map(|e| e.id.len())
        .max()
        .unwrap_or(0);
    for e in explorer.endpoints() {
        let line = format!(
            "{:<width$}  {:<6} {}  {}",
            e.id,
            e.method.as_str(),
            e.path,
            e.summary.as_deref().unwrap_or_default()
        );
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

fn run_validate(text: &str, out: &mut dyn Write) -> Result<(), CliError> {
    let result = editor::validate(text);
    if !result.valid {
        return Err(CliError::InvalidJson {
            message: result.error.unwrap_or_default(),
        });
    }
    writeln!(
        out,
        "Valid JSON ({} characters)",
        result.char_count.unwrap_or_default()
    )?;
    if let Some(parsed) = &result.parsed {
        writeln!(out, "{}", editor::pretty(parsed))?;
    }
    Ok(())
}

fn run_send<S: KvStore>(
    explorer: &mut Explorer<S>,
    sub: &ArgMatches,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    select(explorer, sub)?;

    if let Some(name) = sub.get_one::<String>("template") {
        let template = explorer
            .draft()
            .templates()
            .into_iter()
            .find(|t| t.name == name.as_str())
            .ok_or_else(|| CliError::UnknownTemplate { name: name.clone() })?;
        explorer.draft_mut().apply_template(&template);
    }

    if let Some(json) = sub.get_one::<String>("json-body") {
        let text = read_input(json)?;
        explorer
            .draft_mut()
            .replace_from_json(&text)
            .map_err(|message| CliError::InvalidJson { message })?;
    }

    for field in sub.get_many::<String>("field").into_iter().flatten() {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| CliError::InvalidFieldFormat {
                field: field.to_string(),
            })?;
        explorer.draft_mut().edit_field(key, value);
    }

    for custom in sub.get_many::<String>("custom").into_iter().flatten() {
        let (key, field_type, value) = parse_custom(custom)?;
        let draft = explorer.draft_mut();
        draft.add_custom_field(key, field_type);
        draft.edit_field(key, value);
    }

    let Some(resp) = explorer.send() else {
        return Ok(());
    };
    writeln!(
        out,
        "HTTP {} {} ({})",
        resp.status,
        resp.status_text,
        resp.status_class().as_str()
    )?;
    for (name, value) in &resp.headers {
        writeln!(out, "{name}: {value}")?;
    }
    writeln!(out)?;
    writeln!(out, "{}", resp.body_text())?;
    Ok(())
}

/// `key:type=value`, e.g. `score:number=12`.
fn parse_custom(arg: &str) -> Result<(&str, CustomFieldType, &str), CliError> {
    let invalid = || CliError::InvalidCustomField {
        field: arg.to_string(),
    };
    let (decl, value) = arg.split_once('=').ok_or_else(invalid)?;
    let (key, type_name) = decl.split_once(':').ok_or_else(invalid)?;
    if key.is_empty() {
        return Err(invalid());
    }
    let field_type = CustomFieldType::parse(type_name).ok_or_else(invalid)?;
    Ok((key, field_type, value))
}

fn run_auth<S: KvStore>(
    auth: &mut AuthStore<S>,
    sub: &ArgMatches,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let arg = |m: &ArgMatches, name: &str| m.get_one::<String>(name).cloned().unwrap_or_default();
    match sub.subcommand() {
        Some(("none" | "clear", _)) => auth.clear(),
        Some(("bearer", m)) => auth.set(AuthConfig::bearer(arg(m, "token"))),
        Some(("api-key", m)) => {
            let location = match arg(m, "location").as_str() {
                "query" => ApiKeyLocation::Query,
                _ => ApiKeyLocation::Header,
            };
            auth.set(AuthConfig::api_key(arg(m, "key"), arg(m, "value"), location));
        }
        Some(("basic", m)) => auth.set(AuthConfig::basic(arg(m, "username"), arg(m, "password"))),
        _ => {}
    }
    write_auth(auth.config(), out)
}

fn write_auth(config: &AuthConfig, out: &mut dyn Write) -> Result<(), CliError> {
    writeln!(out, "auth: {}", config.kind())?;
    let m = config.materialize();
    for (name, value) in &m.headers {
        writeln!(out, "  header {name}: {value}")?;
    }
    for (name, value) in &m.query {
        writeln!(out, "  query  {name}={value}")?;
    }
    Ok(())
}

fn write_fields(out: &mut dyn Write, fields: &[Field], depth: usize) -> Result<(), CliError> {
    let indent = "  ".repeat(depth);
    for field in fields {
        let marker = if field.required { "*" } else { "" };
        write!(out, "{indent}{}{marker} [{}]", field.key, describe_kind(&field.kind))?;
        if field.label != field.key {
            write!(out, " {}", field.label)?;
        }
        if let Some(description) = &field.description {
            write!(out, " - {description}")?;
        }
        if !field.value.is_null() {
            write!(out, " = {}", field.display_value())?;
        }
        writeln!(out)?;
        if let FieldKind::Group { fields } = &field.kind {
            write_fields(out, fields, depth + 1)?;
        }
    }
    Ok(())
}

fn describe_kind(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Select { options } => format!("select: {}", options.join("|")),
        FieldKind::TextArea => "textarea".to_string(),
        FieldKind::Input(InputType::Text) => "text".to_string(),
        FieldKind::Input(InputType::Email) => "email".to_string(),
        FieldKind::Input(InputType::Password) => "password".to_string(),
        FieldKind::Input(InputType::Date) => "date".to_string(),
        FieldKind::Number {
            integer,
            minimum,
            maximum,
        } => {
            let name = if *integer { "integer" } else { "number" };
            match (minimum, maximum) {
                (None, None) => name.to_string(),
                (min, max) => format!(
                    "{name} {}..{}",
                    min.as_ref().map(ToString::to_string).unwrap_or_default(),
                    max.as_ref().map(ToString::to_string).unwrap_or_default()
                ),
            }
        }
        FieldKind::Checkbox => "checkbox".to_string(),
        FieldKind::Group { .. } => "object".to_string(),
        FieldKind::JsonArray => "json array".to_string(),
    }
}

/// `-` reads stdin, `@path` reads a file, anything else is taken literally.
fn read_input(arg: &str) -> Result<String, CliError> {
    if arg == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| CliError::InputRead {
                source_name: "stdin".to_string(),
                source,
            })?;
        return Ok(text);
    }
    if let Some(path) = arg.strip_prefix('@') {
        return fs::read_to_string(path).map_err(|source| CliError::InputRead {
            source_name: path.to_string(),
            source,
        });
    }
    Ok(arg.to_string())
}
