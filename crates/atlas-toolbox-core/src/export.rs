use serde_json::{Value, json};

use crate::builder::LayoutOutput;
use crate::model::PlacementRecord;

fn record_fields(r: &PlacementRecord) -> serde_json::Map<String, Value> {
    let frame = json!({"x": r.x, "y": r.y, "w": r.w, "h": r.h});
    let sprite_source_size = json!({
        "x": r.trim_offset.0,
        "y": r.trim_offset.1,
        "w": r.trimmed_size.0,
        "h": r.trimmed_size.1
    });
    let source_size = json!({"w": r.source_size.0, "h": r.source_size.1});
    let flip_of = r.flip_of.map(|f| {
        json!({"canonical": f.canonical, "flipX": f.flip_h, "flipY": f.flip_v})
    });
    let mut m = serde_json::Map::new();
    m.insert("id".into(), json!(r.sprite_id));
    m.insert("group".into(), json!(r.group));
    m.insert("frame".into(), frame);
    m.insert("rotated".into(), json!(r.rotated));
    m.insert("trimmed".into(), json!(r.trimmed()));
    m.insert("spriteSourceSize".into(), sprite_source_size);
    m.insert("sourceSize".into(), source_size);
    m.insert("flipOf".into(), json!(flip_of));
    m
}

fn meta(out: &LayoutOutput) -> Value {
    json!({
        "app": "atlas-toolbox",
        "version": env!("CARGO_PKG_VERSION"),
        "format": "RGBA8888",
        "strategy": out.result.strategy.to_string(),
        "summary": out.summary(),
        "warnings": &out.warnings,
    })
}

/// Serialize pages and their records as `{ pages: [{ index, width, height, frames: [...] }], meta }`.
pub fn to_json_array(out: &LayoutOutput) -> Value {
    let pages_val = out
        .pages
        .iter()
        .map(|p| {
            let frames_val: Vec<Value> = p
                .records
                .iter()
                .map(|r| {
                    let mut m = record_fields(r);
                    m.insert("name".into(), json!(r.name));
                    Value::Object(m)
                })
                .collect();
            json!({
                "index": p.index,
                "width": p.width,
                "height": p.height,
                "frames": frames_val,
            })
        })
        .collect::<Vec<_>>();
    json!({"pages": pages_val, "meta": meta(out)})
}

/// Flatten records keyed by sprite name, with page index/size hints.
/// Shape: `{ frames: { name: { frame, rotated, trimmed, spriteSourceSize, sourceSize, flipOf, page, pageSize } }, meta }`.
/// A repeated name keeps its first record.
pub fn to_json_hash(out: &LayoutOutput) -> Value {
    let mut frames = serde_json::Map::new();
    for page in &out.pages {
        for r in &page.records {
            if frames.contains_key(&r.name) {
                continue;
            }
            let mut m = record_fields(r);
            m.insert("page".into(), json!(page.index));
            m.insert("pageSize".into(), json!({"w": page.width, "h": page.height}));
            frames.insert(r.name.clone(), Value::Object(m));
        }
    }
    json!({ "frames": frames, "meta": meta(out) })
}
