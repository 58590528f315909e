//! `rst pos` — manage positions and their reporting chain.

use anyhow::Result;
use clap::{Args, Subcommand};
use std::io::Write;
use std::path::Path;

use roster_core::model::{
    CreatePosition, Position, PositionLevel, PositionType, UpdatePosition,
};
use roster_core::registry;

use crate::cmd::{domain_fail, open_store};
use crate::output::{OutputMode, pretty_kv, render};

#[derive(Subcommand, Debug)]
pub enum PositionCommand {
    /// Create a position under a unit.
    Add(AddArgs),
    /// Change title, superior, or capacity.
    Update(UpdateArgs),
    /// Retire a position (no active assignments allowed).
    Rm(RmArgs),
    /// Show one position with its occupancy.
    Show(ShowArgs),
    /// Print the superior chain of a position, nearest first.
    Chain(ChainArgs),
    /// List a unit's positions.
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Owning unit id.
    pub unit: i64,

    /// Position title.
    pub title: String,

    /// Type: executive|structural|functional|coordinator|staff.
    #[arg(long = "type")]
    pub position_type: String,

    /// Level: top|middle|lower.
    #[arg(long)]
    pub level: String,

    /// Superior position id; may live in another unit.
    #[arg(long)]
    pub reports_to: Option<i64>,

    /// How many people may hold the position at once (default 1).
    #[arg(long)]
    pub max_holders: Option<u32>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Position id to change.
    pub id: i64,

    /// New title.
    #[arg(long)]
    pub title: Option<String>,

    /// New superior id. Use `--reports-to none` to clear.
    #[arg(long)]
    pub reports_to: Option<String>,

    /// New capacity; must not drop below the current active occupancy.
    #[arg(long)]
    pub max_holders: Option<u32>,
}

#[derive(Args, Debug)]
pub struct RmArgs {
    /// Position id to retire.
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Position id.
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct ChainArgs {
    /// Position id.
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Unit id.
    pub unit: i64,
}

fn render_position(output: OutputMode, position: &Position) -> Result<()> {
    render(output, position, |p, w| {
        pretty_kv(w, "id", p.id.to_string())?;
        pretty_kv(w, "title", &p.title)?;
        pretty_kv(w, "unit", p.unit_id.to_string())?;
        pretty_kv(w, "type", p.position_type.to_string())?;
        pretty_kv(w, "level", p.position_level.to_string())?;
        match p.reports_to {
            Some(superior) => pretty_kv(w, "reports to", superior.to_string()),
            None => pretty_kv(w, "reports to", "-"),
        }?;
        pretty_kv(
            w,
            "occupancy",
            format!(
                "{}/{}{}",
                p.current_holders,
                p.max_holders,
                if p.is_vacant() { " (vacant)" } else { "" }
            ),
        )
    })
}

/// Execute `rst pos add`.
pub fn run_add(args: &AddArgs, output: OutputMode, store: &Path) -> Result<()> {
    let position_type: PositionType = args
        .position_type
        .parse()
        .map_err(|err| domain_fail(output, err))?;
    let position_level: PositionLevel = args
        .level
        .parse()
        .map_err(|err| domain_fail(output, err))?;

    let mut conn = open_store(store, output)?;
    let input = CreatePosition {
        title: args.title.clone(),
        position_type,
        position_level,
        reports_to: args.reports_to,
        max_holders: args.max_holders,
        display_order: None,
    };
    let position = registry::create_position(&mut conn, args.unit, &input)
        .map_err(|err| domain_fail(output, err))?;
    render_position(output, &position)
}

/// Execute `rst pos update`.
pub fn run_update(args: &UpdateArgs, output: OutputMode, store: &Path) -> Result<()> {
    let reports_to = match args.reports_to.as_deref() {
        None => None,
        Some("none") => Some(None),
        Some(raw) => {
            let id: i64 = raw.parse().map_err(|_| {
                anyhow::anyhow!("--reports-to expects a position id or `none`, got '{raw}'")
            })?;
            Some(Some(id))
        }
    };

    let mut conn = open_store(store, output)?;
    let input = UpdatePosition {
        title: args.title.clone(),
        reports_to,
        max_holders: args.max_holders,
        ..UpdatePosition::default()
    };
    let position = registry::update_position(&mut conn, args.id, &input)
        .map_err(|err| domain_fail(output, err))?;
    render_position(output, &position)
}

/// Execute `rst pos rm`.
pub fn run_rm(args: &RmArgs, output: OutputMode, store: &Path) -> Result<()> {
    let mut conn = open_store(store, output)?;
    registry::delete_position(&mut conn, args.id).map_err(|err| domain_fail(output, err))?;
    render(output, &serde_json::json!({ "retired": args.id }), |_, w| {
        writeln!(w, "Retired position {}.", args.id)
    })
}

/// Execute `rst pos show`.
pub fn run_show(args: &ShowArgs, output: OutputMode, store: &Path) -> Result<()> {
    let conn = open_store(store, output)?;
    let position =
        registry::get_position(&conn, args.id).map_err(|err| domain_fail(output, err))?;
    render_position(output, &position)
}

/// Execute `rst pos chain`.
pub fn run_chain(args: &ChainArgs, output: OutputMode, store: &Path) -> Result<()> {
    let mut conn = open_store(store, output)?;
    let chain = registry::reporting_chain(&mut conn, args.id)
        .map_err(|err| domain_fail(output, err))?;
    render(output, &chain, |positions, w| {
        if positions.is_empty() {
            return writeln!(w, "No superiors.");
        }
        for (i, p) in positions.iter().enumerate() {
            writeln!(w, "{}. {} #{} (unit {})", i + 1, p.title, p.id, p.unit_id)?;
        }
        Ok(())
    })
}

/// Execute `rst pos list`.
pub fn run_list(args: &ListArgs, output: OutputMode, store: &Path) -> Result<()> {
    let conn = open_store(store, output)?;
    let positions =
        registry::list_positions(&conn, args.unit).map_err(|err| domain_fail(output, err))?;
    render(output, &positions, |list, w| {
        if list.is_empty() {
            return writeln!(w, "No positions.");
        }
        for p in list {
            writeln!(
                w,
                "#{}  {}  {}/{}  {}",
                p.id, p.title, p.current_holders, p.max_holders, p.position_type
            )?;
        }
        Ok(())
    })
}
