//! `rst unit` — manage the organizational-unit tree.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::io::Write;
use std::path::Path;

use roster_core::model::{CreateUnit, OrgUnit, UnitScope, UpdateUnit};
use roster_core::registry::{self, HierarchyFilter, UnitNode};

use crate::cmd::{domain_fail, open_store};
use crate::output::{OutputMode, pretty_kv, pretty_rule, render};

#[derive(Subcommand, Debug)]
pub enum UnitCommand {
    /// Create a unit.
    Add(AddArgs),
    /// Reparent or rename a unit.
    Move(MoveArgs),
    /// Retire a unit (must be a leaf without positions).
    Rm(RmArgs),
    /// Print the unit tree.
    Tree(TreeArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Unit name.
    pub name: String,

    /// Scope: headquarters|region|campus|department|division|section
    /// (aliases: hq, dept).
    #[arg(long)]
    pub scope: String,

    /// Parent unit id; omit for a root unit.
    #[arg(long)]
    pub parent: Option<i64>,

    /// URL-safe identifier; derived from the name when omitted.
    #[arg(long)]
    pub slug: Option<String>,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Unit id to change.
    pub id: i64,

    /// New parent unit id. Use `--parent none` to make the unit a root.
    #[arg(long)]
    pub parent: Option<String>,

    /// New name.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Unit id to retire.
    pub id: i64,
}

#[derive(Args, Debug, Default)]
pub struct TreeArgs {
    /// Restrict to one scope.
    #[arg(long)]
    pub scope: Option<String>,

    /// Include retired units.
    #[arg(long)]
    pub all: bool,
}

fn parse_scope(raw: &str, output: OutputMode) -> Result<UnitScope> {
    raw.parse::<UnitScope>()
        .map_err(|err| domain_fail(output, err))
}

fn derive_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn render_unit(output: OutputMode, unit: &OrgUnit) -> Result<()> {
    render(output, unit, |u, w| {
        pretty_kv(w, "id", u.id.to_string())?;
        pretty_kv(w, "name", &u.name)?;
        pretty_kv(w, "slug", &u.slug)?;
        pretty_kv(w, "scope", u.scope.to_string())?;
        pretty_kv(w, "level", u.level.to_string())?;
        match u.parent_id {
            Some(pid) => pretty_kv(w, "parent", pid.to_string()),
            None => pretty_kv(w, "parent", "-"),
        }
    })
}

/// Execute `rst unit add`.
pub fn run_add(args: &AddArgs, output: OutputMode, store: &Path) -> Result<()> {
    let scope = parse_scope(&args.scope, output)?;
    let mut conn = open_store(store, output)?;

    let input = CreateUnit {
        name: args.name.clone(),
        slug: args
            .slug
            .clone()
            .unwrap_or_else(|| derive_slug(&args.name)),
        parent_id: args.parent,
        scope,
        display_order: None,
        period_start_us: None,
    };
    let unit =
        registry::create_unit(&mut conn, &input).map_err(|err| domain_fail(output, err))?;
    render_unit(output, &unit)
}

/// Execute `rst unit move`.
pub fn run_move(args: &MoveArgs, output: OutputMode, store: &Path) -> Result<()> {
    let parent_id = match args.parent.as_deref() {
        None => None,
        Some("none") => Some(None),
        Some(raw) => {
            let id: i64 = raw.parse().map_err(|_| {
                anyhow::anyhow!("--parent expects a unit id or `none`, got '{raw}'")
            })?;
            Some(Some(id))
        }
    };

    let mut conn = open_store(store, output)?;
    let input = UpdateUnit {
        name: args.name.clone(),
        parent_id,
        ..UpdateUnit::default()
    };
    let unit = registry::update_unit(&mut conn, args.id, &input)
        .map_err(|err| domain_fail(output, err))?;
    render_unit(output, &unit)
}

/// Execute `rst unit rm`.
pub fn run_rm(args: &RmArgs, output: OutputMode, store: &Path) -> Result<()> {
    let mut conn = open_store(store, output)?;
    registry::delete_unit(&mut conn, args.id).map_err(|err| domain_fail(output, err))?;
    render(output, &serde_json::json!({ "retired": args.id }), |_, w| {
        writeln!(w, "Retired unit {}.", args.id)
    })
}

/// Execute `rst unit tree`.
pub fn run_tree(args: &TreeArgs, output: OutputMode, store: &Path) -> Result<()> {
    let scope = match &args.scope {
        Some(raw) => Some(parse_scope(raw, output)?),
        None => None,
    };
    let conn = open_store(store, output)?;
    let filter = HierarchyFilter {
        scope,
        is_active: if args.all { None } else { Some(true) },
        is_current: None,
    };
    let forest =
        registry::get_hierarchy(&conn, &filter).map_err(|err| domain_fail(output, err))?;

    render(output, &forest, |nodes, w| {
        if nodes.is_empty() {
            return writeln!(w, "No units.");
        }
        pretty_rule(w)?;
        for node in nodes {
            write_node(node, 0, w)?;
        }
        pretty_rule(w)
    })
}

fn write_node(node: &UnitNode, depth: usize, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "{:indent$}{} [{}] #{}",
        "",
        node.unit.name,
        node.unit.scope,
        node.unit.id,
        indent = depth * 2
    )?;
    for child in &node.children {
        write_node(child, depth + 1, w)?;
    }
    Ok(())
}
