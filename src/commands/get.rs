use std::io::Write;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::info;

use crate::keystone::{filter, Group, KeystoneClient, Role};
use crate::transport::Transport;

/// Flags of the `get` command.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub role: Option<String>,
    pub group: Option<String>,
    pub nimbus_folder: Option<String>,
    pub user_id: Option<String>,
    pub my_group: bool,
    pub exact: bool,
    pub sort: bool,
    pub abilities: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetPlan {
    /// Nothing to look up.
    Nothing,
    Query,
}

impl GetOptions {
    /// Decides whether a lookup (and therefore a login) is needed.
    pub fn plan(&self) -> Result<GetPlan> {
        if self.role.is_some() || self.group.is_some() {
            return Ok(GetPlan::Query);
        }
        if self.nimbus_folder.is_some() {
            bail!("--nimbusfolder lookups are not supported by this client");
        }
        if self.user_id.is_some() {
            bail!("--userid lookups are not supported by this client");
        }
        if self.my_group {
            bail!("--mygroup lookups are not supported by this client");
        }
        Ok(GetPlan::Nothing)
    }
}

pub fn run<T: Transport, W: Write>(
    client: &KeystoneClient<T>,
    opts: &GetOptions,
    out: &mut W,
) -> Result<()> {
    if opts.plan()? == GetPlan::Nothing {
        writeln!(out, "No RoleName!")?;
        return Ok(());
    }
    let prefix = client.config().org_prefix.clone();

    if let Some(name) = &opts.role {
        let mut roles = client
            .find_role(name, opts.exact)
            .with_context(|| format!("looking up role `{name}`"))?;
        if opts.sort {
            filter::sort_by_display_name(&mut roles, &prefix);
        }
        info!(count = roles.len(), role = %name, "role lookup finished");
        print_roles(&roles, opts.abilities, out)?;
    }

    if let Some(name) = &opts.group {
        let mut groups = client
            .find_group(name, opts.exact)
            .with_context(|| format!("looking up group `{name}`"))?;
        if opts.sort {
            filter::sort_by_display_name(&mut groups, &prefix);
        }
        info!(count = groups.len(), group = %name, "group lookup finished");
        print_groups(&groups, out)?;
    }

    Ok(())
}

fn display_value(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => "<nil>".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn print_roles<W: Write>(roles: &[Role], abilities: bool, out: &mut W) -> Result<()> {
    writeln!(out, "===========================================")?;
    let total = roles.len();
    for (i, role) in roles.iter().enumerate() {
        if i > 0 {
            writeln!(out, "-------------------------------------------")?;
        }
        writeln!(out, "Role {}/{}: {}", i + 1, total, role.name)?;
        writeln!(out, "\tApplicationId: {}", role.application_id)?;
        writeln!(out, "\tDescription: {}", role.description.as_deref().unwrap_or(""))?;
        writeln!(
            out,
            "\tConditionalExpression: {}",
            display_value(&role.conditional_expression)
        )?;
        if abilities {
            for ability in role.functional_abilities() {
                writeln!(out, "\tFunctionalAbility: {}", ability.name)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn print_groups<W: Write>(groups: &[Group], out: &mut W) -> Result<()> {
    for group in groups {
        writeln!(out, "Name: {}", group.name)?;
    }
    Ok(())
}
