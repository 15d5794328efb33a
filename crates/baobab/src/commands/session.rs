//! Server and session information handlers.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;

use baobab_core::Sdk;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize, Tabled)]
struct PluginRow {
    #[tabled(rename = "Plugin")]
    plugin: String,
}

pub fn plugins(sdk: &Sdk, global: &GlobalOpts) -> Result<(), CliError> {
    let rows: Vec<PluginRow> = sdk
        .plugins()
        .into_iter()
        .map(|plugin| PluginRow { plugin })
        .collect();
    let out = output::render_list(
        &global.output,
        &rows,
        |r| PluginRow {
            plugin: r.plugin.clone(),
        },
        |r| r.plugin.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[derive(Debug, Serialize)]
struct Whoami {
    login_id: Option<String>,
    login_record: i64,
    name: String,
    is_manager: bool,
    security_tokens: Vec<i64>,
    user_record: Option<i64>,
    user_name: Option<String>,
}

pub fn whoami(sdk: &Sdk, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_login(sdk, global)?;
    let login = sdk.my_login().ok_or_else(|| CliError::NotFound {
        resource_type: "login".into(),
        identifier: "this session".into(),
    })?;
    let user = sdk.my_user();
    let permissions = sdk.permissions();

    let me = Whoami {
        login_id: login
            .security()
            .and_then(|s| s.login_id())
            .map(str::to_owned),
        login_record: login.id(),
        name: login.name().to_owned(),
        is_manager: permissions.is_manager,
        security_tokens: permissions.tokens.iter().copied().collect(),
        user_record: user.as_ref().map(baobab_core::Record::id),
        user_name: user.as_ref().map(|u| u.name().to_owned()),
    };

    let out = output::render_single(&global.output, &me, detail, |m| {
        m.login_id.clone().unwrap_or_else(|| m.login_record.to_string())
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(me: &Whoami) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "Login:    {} (#{})", output::opt(me.login_id.as_ref()), me.login_record);
    let _ = writeln!(s, "Name:     {}", me.name);
    let _ = writeln!(s, "Manager:  {}", if me.is_manager { "yes" } else { "no" });
    let tokens: Vec<String> = me.security_tokens.iter().map(ToString::to_string).collect();
    let _ = writeln!(s, "Tokens:   {}", tokens.join(", "));
    match (me.user_record, &me.user_name) {
        (Some(id), Some(name)) => {
            let _ = write!(s, "User:     {name} (#{id})");
        }
        _ => s.push_str("User:     -"),
    }
    s
}
