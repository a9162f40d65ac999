use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use encoding_rs::Encoding;
use minion_engine::{
    FileStorage, IdSource, Minion, MinionId, Roster, SpawnData, Tracker, TrackerConfig,
};
use std::{fs, path::Path, path::PathBuf};
use tracing::{debug, Level};

#[derive(Subcommand)]
enum Cmd {
    /// Spawn a new minion at full health
    Spawn {
        #[arg(long)]
        name: String,
        /// Starting (and maximum) hit points
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
        hp: i32,
        /// Armor class
        #[arg(long, allow_negative_numbers = true)]
        ac: i32,
        /// Attack bonus
        #[arg(long, allow_negative_numbers = true)]
        attack: i32,
        /// Damage expression, stored as text (e.g. 1d6+2)
        #[arg(long, default_value = "")]
        damage: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List minions in the order they were spawned
    List {
        /// Include dismissed minions
        #[arg(long)]
        all: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one minion
    Show {
        /// Minion id or unique id prefix
        id: String,
    },
    /// Heal a minion (capped at max HP)
    Heal {
        id: String,
        #[arg(value_parser = clap::value_parser!(i32).range(1..))]
        amount: i32,
    },
    /// Damage a minion (floored at 0 HP)
    Damage {
        id: String,
        #[arg(value_parser = clap::value_parser!(i32).range(1..))]
        amount: i32,
    },
    /// Change HP by a signed delta
    Adjust {
        id: String,
        #[arg(allow_negative_numbers = true)]
        delta: i32,
    },
    /// Edit fields of a minion; unspecified fields keep their value
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        hp: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        max_hp: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        ac: Option<i32>,
        #[arg(long, allow_negative_numbers = true)]
        attack: Option<i32>,
        #[arg(long)]
        damage: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Dismiss a minion (kept in storage, hidden from the list)
    Dismiss { id: String },
    /// Write the full roster as JSON to stdout
    Export {
        /// Indented, multi-line JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Replace the roster with the contents of a JSON file
    Import { file: PathBuf },
}

#[derive(Parser)]
#[command(name = "minion")]
#[command(about = "Track minions during tabletop combat")]
struct Cli {
    /// YAML or JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the roster file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Record name for the roster
    #[arg(long, global = true)]
    key: Option<String>,
    /// Seed for reproducible ids
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<TrackerConfig> {
    let mut cfg = match &cli.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        cfg.data_dir = dir.clone();
    }
    if let Some(key) = &cli.key {
        cfg.key = key.clone();
    }
    if cli.seed.is_some() {
        cfg.seed = cli.seed;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn open_tracker(cfg: &TrackerConfig) -> Tracker<FileStorage> {
    debug!(dir = %cfg.data_dir.display(), key = %cfg.key, "opening roster");
    let tracker =
        Tracker::open(FileStorage::new(&cfg.data_dir), &cfg.key).with_pretty(cfg.pretty);
    // Each run restarts the stream; offset it by roster size so runs differ.
    // Ids already in the roster are skipped by the tracker.
    let ids = match cfg.seed {
        Some(seed) => IdSource::from_seed(seed.wrapping_add(tracker.roster().len() as u64)),
        None => IdSource::Random,
    };
    tracker.with_id_source(ids)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cfg = load_config(&cli)?;
    let mut tracker = open_tracker(&cfg);

    match cli.cmd {
        Cmd::Spawn {
            name,
            hp,
            ac,
            attack,
            damage,
            notes,
        } => {
            let id = tracker.spawn(SpawnData {
                name,
                hp,
                ac,
                attack,
                damage,
                notes,
            });
            println!("{}", id);
        }
        Cmd::List { all, json } => {
            let shown: Vec<&Minion> = if all {
                tracker.roster().iter().collect()
            } else {
                tracker.active().collect()
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else if shown.is_empty() {
                println!("no minions");
            } else {
                for m in shown {
                    println!("{}", row(m));
                }
            }
        }
        Cmd::Show { id } => {
            let m = tracker.resolve(&id)?;
            println!("{}", serde_json::to_string_pretty(m)?);
        }
        Cmd::Heal { id, amount } => {
            let id = resolve_id(&tracker, &id)?;
            tracker.heal(id, amount);
            print_hp(&tracker, id);
        }
        Cmd::Damage { id, amount } => {
            let id = resolve_id(&tracker, &id)?;
            tracker.damage(id, amount);
            print_hp(&tracker, id);
        }
        Cmd::Adjust { id, delta } => {
            let id = resolve_id(&tracker, &id)?;
            tracker.adjust_hp(id, delta);
            print_hp(&tracker, id);
        }
        Cmd::Edit {
            id,
            name,
            hp,
            max_hp,
            ac,
            attack,
            damage,
            notes,
        } => {
            let mut m = tracker.resolve(&id)?.clone();
            if let Some(v) = name {
                m.name = v;
            }
            if let Some(v) = max_hp {
                m.max_hp = v;
            }
            if let Some(v) = hp {
                m.hp = v;
            }
            if let Some(v) = ac {
                m.ac = v;
            }
            if let Some(v) = attack {
                m.attack = v;
            }
            if let Some(v) = damage {
                m.damage = v;
            }
            if let Some(v) = notes {
                m.notes = v;
            }
            let id = m.id;
            tracker.replace(m);
            if let Some(m) = tracker.find(id) {
                println!("{}", row(m));
            }
        }
        Cmd::Dismiss { id } => {
            let id = resolve_id(&tracker, &id)?;
            tracker.soft_delete(id);
            println!("dismissed {}", id);
        }
        Cmd::Export { pretty } => {
            println!("{}", minion_engine::to_json(tracker.roster(), pretty)?);
        }
        Cmd::Import { file } => {
            let text = read_text_auto(&file)?;
            let roster: Roster = minion_engine::from_json(&text)
                .with_context(|| format!("failed to parse roster JSON: {}", file.display()))?;
            let count = roster.len();
            tracker.set_all(roster);
            println!("imported {} minions", count);
        }
    }
    Ok(())
}

fn resolve_id(tracker: &Tracker<FileStorage>, prefix: &str) -> Result<MinionId> {
    Ok(tracker.resolve(prefix)?.id)
}

fn print_hp(tracker: &Tracker<FileStorage>, id: MinionId) {
    if let Some(m) = tracker.find(id) {
        println!("{} HP {}/{}", m.name, m.hp, m.max_hp);
    }
}

fn short_id(id: MinionId) -> String {
    id.to_string()[..8].to_string()
}

fn row(m: &Minion) -> String {
    let mut line = format!(
        "{}  {:<16} HP {}/{}  AC {}  Atk {:+}  Dmg {}",
        short_id(m.id),
        m.name,
        m.hp,
        m.max_hp,
        m.ac,
        m.attack,
        m.damage
    );
    if m.is_low_hp() {
        line.push_str("  LOW");
    }
    if !m.notes.is_empty() {
        line.push_str(&format!("  ({})", m.notes));
    }
    if !m.active {
        line.push_str("  [dismissed]");
    }
    line
}

fn read_text_auto(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read file: {}", path.display()))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _) = enc.decode_without_bom_handling(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}
