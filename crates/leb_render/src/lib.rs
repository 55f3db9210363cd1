use std::fmt::Write as _;

use leb_core::VariantField;
use leb_core::core_api::{ActorEntry, GridEntry, PointEntry, Session};
use leb_core::room::Vec3;
use serde_json::{Map as JsonMap, Value as JsonValue};

const TYPE_COL_WIDTH: usize = 24;
const TILES_PER_ROW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRenderOptions {
    /// Include parameters, switches and links under each actor.
    pub verbose: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldSelection {
    pub summary: bool,
    pub actors: bool,
    pub grid: bool,
    pub points: bool,
}

impl FieldSelection {
    pub fn is_any_selected(&self) -> bool {
        self.summary || self.actors || self.grid || self.points
    }
}

pub fn render_json_full(session: &Session, style: JsonStyle) -> JsonValue {
    let all = FieldSelection {
        summary: true,
        actors: true,
        grid: true,
        points: true,
    };
    render_json_selected(session, &all, style)
}

pub fn render_json_selected(
    session: &Session,
    fields: &FieldSelection,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(selected_json(fields, session)),
    }
}

pub fn render_text(session: &Session, options: TextRenderOptions) -> String {
    let all = FieldSelection {
        summary: true,
        actors: true,
        grid: false,
        points: true,
    };
    render_text_selected(session, &all, options)
}

pub fn render_text_selected(
    session: &Session,
    fields: &FieldSelection,
    options: TextRenderOptions,
) -> String {
    let mut out = String::new();
    if fields.summary {
        write_summary(&mut out, session);
    }
    if fields.actors {
        write_actors(&mut out, &session.actors(), options);
    }
    if fields.points {
        write_points(&mut out, &session.points());
    }
    if fields.grid {
        match session.grid() {
            Some(grid) => write_grid(&mut out, &grid),
            None => writeln!(&mut out, "Grid: none").expect("writing to String cannot fail"),
        }
    }
    out
}

fn selected_json(fields: &FieldSelection, session: &Session) -> JsonMap<String, JsonValue> {
    let snapshot = session.snapshot();
    let mut out = JsonMap::new();

    if fields.summary {
        out.insert(
            "dimension".to_string(),
            match snapshot.dimension {
                Some(d) => JsonValue::String(d.to_string()),
                None => JsonValue::Null,
            },
        );
        out.insert(
            "room_width".to_string(),
            snapshot.room_width.map_or(JsonValue::Null, JsonValue::from),
        );
        out.insert(
            "room_height".to_string(),
            snapshot.room_height.map_or(JsonValue::Null, JsonValue::from),
        );
        out.insert(
            "actor_count".to_string(),
            JsonValue::from(snapshot.actor_count),
        );
        out.insert(
            "point_count".to_string(),
            JsonValue::from(snapshot.point_count),
        );
        out.insert(
            "rail_count".to_string(),
            JsonValue::from(snapshot.rail_count),
        );
    }
    if fields.actors {
        out.insert(
            "actors".to_string(),
            JsonValue::Array(session.actors().iter().map(actor_to_json).collect()),
        );
    }
    if fields.points {
        out.insert(
            "points".to_string(),
            JsonValue::Array(session.points().iter().map(point_to_json).collect()),
        );
    }
    if fields.grid {
        out.insert(
            "grid".to_string(),
            match session.grid() {
                Some(grid) => grid_to_json(&grid),
                None => JsonValue::Null,
            },
        );
    }

    out
}

fn actor_to_json(actor: &ActorEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("index".to_string(), JsonValue::from(actor.index));
    m.insert(
        "key".to_string(),
        JsonValue::String(format!("{:016X}", actor.key)),
    );
    m.insert("name".to_string(), JsonValue::String(actor.name.clone()));
    m.insert("type_id".to_string(), JsonValue::from(actor.type_id));
    m.insert("type".to_string(), JsonValue::String(actor.type_name.clone()));
    m.insert("room_id".to_string(), JsonValue::from(actor.room_id));
    m.insert("position".to_string(), vec3_to_json(actor.position));
    m.insert("rotation".to_string(), vec3_to_json(actor.rotation));
    m.insert("scale".to_string(), vec3_to_json(actor.scale));
    m.insert(
        "parameters".to_string(),
        JsonValue::Array(
            actor
                .parameters
                .iter()
                .map(|p| {
                    let mut pm = JsonMap::new();
                    pm.insert("slot".to_string(), JsonValue::from(p.slot));
                    pm.insert("value".to_string(), variant_to_json(&p.value));
                    if let Some(description) = &p.description {
                        pm.insert(
                            "description".to_string(),
                            JsonValue::String(description.clone()),
                        );
                    }
                    JsonValue::Object(pm)
                })
                .collect(),
        ),
    );
    m.insert(
        "switches".to_string(),
        JsonValue::Array(
            actor
                .switches
                .iter()
                .map(|s| {
                    let mut sm = JsonMap::new();
                    sm.insert("slot".to_string(), JsonValue::from(s.slot));
                    sm.insert("usage".to_string(), JsonValue::String(s.usage.clone()));
                    sm.insert("index".to_string(), JsonValue::from(s.index));
                    JsonValue::Object(sm)
                })
                .collect(),
        ),
    );
    m.insert(
        "controls".to_string(),
        JsonValue::Array(
            actor
                .controls
                .iter()
                .map(|c| {
                    let mut cm = JsonMap::new();
                    cm.insert("target".to_string(), JsonValue::from(c.target));
                    cm.insert("params".to_string(), params_to_json(&c.params));
                    JsonValue::Object(cm)
                })
                .collect(),
        ),
    );
    m.insert(
        "dependencies".to_string(),
        JsonValue::Array(
            actor
                .dependencies
                .iter()
                .map(|d| {
                    let mut dm = JsonMap::new();
                    dm.insert("rail".to_string(), JsonValue::from(d.rail));
                    dm.insert("point".to_string(), JsonValue::from(d.point));
                    dm.insert("params".to_string(), params_to_json(&d.params));
                    JsonValue::Object(dm)
                })
                .collect(),
        ),
    );
    m.insert(
        "controlled_by".to_string(),
        JsonValue::Array(actor.controlled_by.iter().map(|&i| JsonValue::from(i)).collect()),
    );
    m.insert("visible".to_string(), JsonValue::Bool(actor.visible));
    JsonValue::Object(m)
}

fn point_to_json(point: &PointEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("index".to_string(), JsonValue::from(point.index));
    m.insert("position".to_string(), vec3_to_json(point.position));
    JsonValue::Object(m)
}

fn grid_to_json(grid: &GridEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert(
        "dimension".to_string(),
        JsonValue::String(grid.dimension.to_string()),
    );
    m.insert("room_width".to_string(), JsonValue::from(grid.room_width));
    m.insert("room_height".to_string(), JsonValue::from(grid.room_height));
    m.insert("tile_size".to_string(), JsonValue::from(grid.tile_size));
    m.insert("x".to_string(), JsonValue::from(grid.x));
    m.insert("z".to_string(), JsonValue::from(grid.z));
    m.insert(
        "tiles".to_string(),
        JsonValue::Array(
            grid.tiles
                .iter()
                .map(|t| {
                    let mut tm = JsonMap::new();
                    tm.insert("index".to_string(), JsonValue::from(t.index));
                    tm.insert(
                        "flags".to_string(),
                        JsonValue::Array(t.flags.iter().cloned().map(JsonValue::String).collect()),
                    );
                    tm.insert("chain_index".to_string(), JsonValue::from(t.chain_index));
                    tm.insert("elevation".to_string(), JsonValue::from(t.elevation));
                    JsonValue::Object(tm)
                })
                .collect(),
        ),
    );
    JsonValue::Object(m)
}

fn vec3_to_json(v: Vec3) -> JsonValue {
    JsonValue::Array(vec![
        JsonValue::from(v.x),
        JsonValue::from(v.y),
        JsonValue::from(v.z),
    ])
}

fn variant_to_json(value: &VariantField) -> JsonValue {
    match value {
        VariantField::Int(v) => JsonValue::from(*v),
        VariantField::Float(v) => JsonValue::from(*v),
        VariantField::Name(s) => JsonValue::String(s.clone()),
    }
}

fn params_to_json(params: &[VariantField; 2]) -> JsonValue {
    JsonValue::Array(params.iter().map(variant_to_json).collect())
}

fn write_summary(out: &mut String, session: &Session) {
    let snapshot = session.snapshot();
    let layout = match (snapshot.dimension, snapshot.room_width, snapshot.room_height) {
        (Some(d), Some(w), Some(h)) => format!("{d} room, {w}x{h}"),
        _ => "no grid".to_string(),
    };
    writeln!(
        out,
        "Room: {layout}; {} actors, {} points, {} rails",
        snapshot.actor_count, snapshot.point_count, snapshot.rail_count
    )
    .expect("writing to String cannot fail");
}

fn write_actors(out: &mut String, actors: &[ActorEntry], options: TextRenderOptions) {
    writeln!(out, "Actors:").expect("writing to String cannot fail");
    for actor in actors {
        writeln!(
            out,
            "  [{:>3}] {:<width$} {}  room {}  pos {}{}",
            actor.index,
            actor.type_name,
            actor.name,
            actor.room_id,
            actor.position,
            if actor.visible { "" } else { "  (hidden)" },
            width = TYPE_COL_WIDTH,
        )
        .expect("writing to String cannot fail");

        if !options.verbose {
            continue;
        }
        writeln!(out, "        rot {}  scale {}", actor.rotation, actor.scale)
            .expect("writing to String cannot fail");
        for p in &actor.parameters {
            match &p.description {
                Some(d) => writeln!(out, "        param {}: {} ({d})", p.slot, p.value),
                None => writeln!(out, "        param {}: {}", p.slot, p.value),
            }
            .expect("writing to String cannot fail");
        }
        for s in &actor.switches {
            writeln!(out, "        switch {}: {} #{}", s.slot, s.usage, s.index)
                .expect("writing to String cannot fail");
        }
        for c in &actor.controls {
            writeln!(
                out,
                "        controls [{}] ({}, {})",
                c.target, c.params[0], c.params[1]
            )
            .expect("writing to String cannot fail");
        }
        for d in &actor.dependencies {
            writeln!(
                out,
                "        rail {} point {} ({}, {})",
                d.rail, d.point, d.params[0], d.params[1]
            )
            .expect("writing to String cannot fail");
        }
        if !actor.controlled_by.is_empty() {
            let list: Vec<String> = actor.controlled_by.iter().map(u32::to_string).collect();
            writeln!(out, "        controlled by {}", list.join(", "))
                .expect("writing to String cannot fail");
        }
    }
}

fn write_points(out: &mut String, points: &[PointEntry]) {
    writeln!(out, "Points:").expect("writing to String cannot fail");
    for point in points {
        writeln!(out, "  [{:>3}] {}", point.index, point.position)
            .expect("writing to String cannot fail");
    }
}

fn write_grid(out: &mut String, grid: &GridEntry) {
    writeln!(
        out,
        "Grid: {} {}x{}, tile size {}, origin ({}, {})",
        grid.dimension, grid.room_width, grid.room_height, grid.tile_size, grid.x, grid.z
    )
    .expect("writing to String cannot fail");
    // One character per tile: '#' collision, '~' water or lava, '.' open.
    for row in grid.tiles.chunks(TILES_PER_ROW) {
        let line: String = row
            .iter()
            .map(|t| {
                if t.flags.iter().any(|f| f == "contains_collision") {
                    '#'
                } else if t
                    .flags
                    .iter()
                    .any(|f| f == "water_lava" || f == "deep_water_lava")
                {
                    '~'
                } else {
                    '.'
                }
            })
            .collect();
        writeln!(out, "  {line}").expect("writing to String cannot fail");
    }
}
