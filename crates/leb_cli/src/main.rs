use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use leb_core::EditorConfig;
use leb_core::core_api::{ActorCatalog, Engine, Session};
use leb_core::room::Vec3;
use leb_core::room::actor::Transform;
use leb_core::variant::VariantField;
use leb_render::{
    FieldSelection, JsonStyle, TextRenderOptions, render_json_full, render_json_selected,
    render_text, render_text_selected,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Room file, or a room name such as `Field_11A` looked up through the config.
    #[arg(value_name = "ROOM.leb")]
    path: PathBuf,
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(long)]
    json: bool,
    #[arg(long)]
    verbose: bool,
    #[arg(long)]
    summary: bool,
    #[arg(long)]
    actors: bool,
    #[arg(long)]
    grid: bool,
    #[arg(long)]
    points: bool,
    #[arg(long = "copy-actor", value_name = "I")]
    copy_actor: Vec<usize>,
    #[arg(long = "delete-actor", value_name = "I")]
    delete_actor: Vec<usize>,
    #[arg(long = "retype-actor", value_name = "I=TYPE", value_parser = parse_indexed_text)]
    retype_actor: Vec<(usize, String)>,
    #[arg(
        long = "set-position",
        value_name = "I=X,Y,Z",
        value_parser = parse_indexed_vec3,
        allow_hyphen_values = true
    )]
    set_position: Vec<(usize, Vec3)>,
    #[arg(
        long = "set-rotation",
        value_name = "I=X,Y,Z",
        value_parser = parse_indexed_vec3,
        allow_hyphen_values = true
    )]
    set_rotation: Vec<(usize, Vec3)>,
    #[arg(
        long = "set-scale",
        value_name = "I=X,Y,Z",
        value_parser = parse_indexed_vec3,
        allow_hyphen_values = true
    )]
    set_scale: Vec<(usize, Vec3)>,
    #[arg(
        long = "set-param",
        value_name = "I:SLOT=VALUE",
        value_parser = parse_param_edit,
        allow_hyphen_values = true
    )]
    set_param: Vec<ParamEdit>,
    #[arg(long = "set-key", value_name = "I=HEX", value_parser = parse_key_edit)]
    set_key: Vec<(usize, u64)>,
    #[arg(long, value_name = "PATH", conflicts_with = "out_dir")]
    output: Option<PathBuf>,
    /// Write into `<DIR>/region_common/level/<Level>/` instead of a single path.
    #[arg(long = "out-dir", value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct ParamEdit {
    index: usize,
    slot: usize,
    value: VariantField,
}

impl Cli {
    fn fields(&self) -> FieldSelection {
        FieldSelection {
            summary: self.summary,
            actors: self.actors,
            grid: self.grid,
            points: self.points,
        }
    }

    fn has_edits(&self) -> bool {
        !self.copy_actor.is_empty()
            || !self.delete_actor.is_empty()
            || !self.retype_actor.is_empty()
            || !self.set_position.is_empty()
            || !self.set_rotation.is_empty()
            || !self.set_scale.is_empty()
            || !self.set_param.is_empty()
            || !self.set_key.is_empty()
    }
}

fn split_index(s: &str, sep: char) -> Result<(usize, &str), String> {
    let (index, rest) = s
        .split_once(sep)
        .ok_or_else(|| format!("expected I{sep}..., got '{s}'"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid actor index '{index}'"))?;
    Ok((index, rest))
}

fn parse_indexed_text(s: &str) -> Result<(usize, String), String> {
    let (index, text) = split_index(s, '=')?;
    Ok((index, text.to_string()))
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("invalid vector '{s}'"))?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected X,Y,Z, got '{s}'")),
    }
}

fn parse_indexed_vec3(s: &str) -> Result<(usize, Vec3), String> {
    let (index, rest) = split_index(s, '=')?;
    Ok((index, parse_vec3(rest)?))
}

fn parse_param_edit(s: &str) -> Result<ParamEdit, String> {
    let (index, rest) = split_index(s, ':')?;
    let (slot, value) = rest
        .split_once('=')
        .ok_or_else(|| format!("expected I:SLOT=VALUE, got '{s}'"))?;
    let slot = slot
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid parameter slot '{slot}'"))?;
    Ok(ParamEdit {
        index,
        slot,
        value: VariantField::parse_user(value),
    })
}

fn parse_key_edit(s: &str) -> Result<(usize, u64), String> {
    let (index, hex) = split_index(s, '=')?;
    let hex = hex.trim();
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    let key = u64::from_str_radix(digits, 16).map_err(|_| format!("invalid key '{hex}'"))?;
    Ok((index, key))
}

fn resolve_room_path(path: &Path, config: &EditorConfig) -> PathBuf {
    if path.is_file() {
        return path.to_path_buf();
    }
    path.to_str()
        .and_then(|room| config.room_path(room))
        .unwrap_or_else(|| path.to_path_buf())
}

fn apply_edits(session: &mut Session, cli: &Cli) -> Result<(), String> {
    for &index in &cli.copy_actor {
        let copy = session
            .copy_actor(index)
            .map_err(|e| format!("copying actor {index}: {e}"))?;
        log::info!("copied actor {index} to {copy}");
    }
    for (index, type_text) in &cli.retype_actor {
        let type_id = session
            .catalog()
            .resolve_type(type_text)
            .map_err(|e| format!("retyping actor {index}: {e}"))?;
        session
            .retype_actor(*index, type_id)
            .map_err(|e| format!("retyping actor {index}: {e}"))?;
    }

    let transform_edits = [
        ("position", &cli.set_position),
        ("rotation", &cli.set_rotation),
        ("scale", &cli.set_scale),
    ];
    for (what, edits) in transform_edits {
        for &(index, value) in edits {
            let mut transform: Transform = session
                .room()
                .actor(index)
                .map(|a| a.transform)
                .ok_or_else(|| format!("setting {what}: no actor {index}"))?;
            match what {
                "position" => transform.position = value,
                "rotation" => transform.rotation = value,
                _ => transform.scale = value,
            }
            session
                .room_mut()
                .set_transform(index, transform)
                .map_err(|e| format!("setting {what} of actor {index}: {e}"))?;
        }
    }

    for edit in &cli.set_param {
        session
            .room_mut()
            .set_parameter(edit.index, edit.slot, edit.value.clone())
            .map_err(|e| format!("setting parameter {} of actor {}: {e}", edit.slot, edit.index))?;
    }
    for &(index, key) in &cli.set_key {
        session
            .room_mut()
            .set_actor_key(index, key)
            .map_err(|e| format!("setting key of actor {index}: {e}"))?;
    }

    // Highest index first so earlier deletions don't shift later ones.
    let mut deletions = cli.delete_actor.clone();
    deletions.sort_unstable_by(|a, b| b.cmp(a));
    deletions.dedup();
    for index in deletions {
        session
            .delete_actor(index)
            .map_err(|e| format!("deleting actor {index}: {e}"))?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let has_edits = cli.has_edits();
    let writes_output = cli.output.is_some() || cli.out_dir.is_some();
    if has_edits && !writes_output {
        eprintln!("edit flags require --output <PATH> or --out-dir <DIR>");
        process::exit(2);
    }

    let mut config = match &cli.config {
        Some(path) => EditorConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Error reading config {}: {e}", path.display());
            process::exit(1);
        }),
        None => EditorConfig::default(),
    };
    if let Some(dir) = &cli.out_dir {
        config.output_path = dir.clone();
    }

    let catalog_path = cli.catalog.clone().or_else(|| config.catalog_path.clone());
    let catalog = match catalog_path {
        Some(path) => ActorCatalog::load(&path).unwrap_or_else(|e| {
            eprintln!("Error reading actor catalog {}: {e}", path.display());
            process::exit(1);
        }),
        None => ActorCatalog::default(),
    };

    let room_path = resolve_room_path(&cli.path, &config);
    let out_path = match (&cli.output, &cli.out_dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(_)) => Some(config.output_file_for(&room_path).unwrap_or_else(|| {
            eprintln!(
                "cannot derive a level folder from {}; use --output",
                room_path.display()
            );
            process::exit(2);
        })),
        (None, None) => None,
    };

    let engine = Engine::with_catalog(catalog);
    let mut session = engine.open_path(&room_path).unwrap_or_else(|e| {
        eprintln!("Error opening room file: {}", room_path.display());
        eprintln!("  {e}");
        process::exit(1);
    });

    if let Err(e) = apply_edits(&mut session, &cli) {
        eprintln!("Error applying edit: {e}");
        process::exit(1);
    }

    if let Some(out_path) = &out_path {
        session.save_to(out_path).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {e}", out_path.display());
            process::exit(1);
        });
    }

    let fields = cli.fields();
    let options = TextRenderOptions {
        verbose: cli.verbose,
    };

    if cli.json {
        let json = if fields.is_any_selected() {
            render_json_selected(&session, &fields, JsonStyle::CanonicalV1)
        } else {
            render_json_full(&session, JsonStyle::CanonicalV1)
        };
        let rendered = serde_json::to_string_pretty(&json).unwrap_or_else(|e| {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        });
        println!("{rendered}");
        return;
    }

    if fields.is_any_selected() {
        print!("{}", render_text_selected(&session, &fields, options));
        return;
    }

    if let Some(out_path) = &out_path {
        println!("Wrote edited room to {}", out_path.display());
        return;
    }

    print!("{}", render_text(&session, options));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_indexed_vectors() {
        let (index, v) = parse_indexed_vec3("3=1,-2.5, 4").expect("valid");
        assert_eq!(index, 3);
        assert_eq!(v, Vec3::new(1.0, -2.5, 4.0));
        assert!(parse_indexed_vec3("3=1,2").is_err());
        assert!(parse_indexed_vec3("x=1,2,3").is_err());
    }

    #[test]
    fn parses_param_edits_with_user_values() {
        let edit = parse_param_edit("1:2=FlagOpen").expect("valid");
        assert_eq!((edit.index, edit.slot), (1, 2));
        assert_eq!(edit.value, VariantField::Name("FlagOpen".into()));

        let edit = parse_param_edit("0:7=-3").expect("valid");
        assert_eq!(edit.value, VariantField::Int(-3));
        assert!(parse_param_edit("0=3").is_err());
    }

    #[test]
    fn parses_hex_keys_with_or_without_prefix() {
        assert_eq!(parse_key_edit("2=0xABCD").expect("valid"), (2, 0xABCD));
        assert_eq!(parse_key_edit("2=ff").expect("valid"), (2, 0xFF));
        assert!(parse_key_edit("2=zz").is_err());
    }
}
