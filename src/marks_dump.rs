use crate::geometry::Rect;
use crate::pipeline::Mark;
use crate::pipeline::colors::Color;
use crate::pipeline::label_placement::LabelPosition;
use crate::scene::{NodeId, SceneProvider};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct MarksDump {
    pub viewport: Rect,
    pub hidden: bool,
    pub marks: Vec<MarkDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkDump {
    pub index: usize,
    pub node: NodeId,
    pub element_id: Option<String>,
    pub tag: String,
    #[serde(rename = "box")]
    pub rect: Rect,
    pub color: Color,
    pub label_color: Color,
    pub label: LabelPosition,
    pub editable: bool,
}

impl MarksDump {
    pub fn from_marks<P: SceneProvider>(provider: &P, marks: &[Mark], hidden: bool) -> Self {
        let marks = marks
            .iter()
            .map(|mark| {
                let element = provider.element(mark.node);
                MarkDump {
                    index: mark.index,
                    node: mark.node,
                    element_id: element.element_id.clone(),
                    tag: element.tag.clone(),
                    rect: mark.rect,
                    color: mark.color,
                    label_color: mark.label_color,
                    label: mark.label,
                    editable: mark.editable,
                }
            })
            .collect();
        MarksDump {
            viewport: provider.viewport_bound(),
            hidden,
            marks,
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout.
pub fn write_marks_dump(dump: &MarksDump, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeSnapshot, Scene, SceneSnapshot, Viewport};

    #[test]
    fn dump_uses_camel_case_and_box_key() {
        let root = NodeSnapshot::new("body", Rect::new(0.0, 0.0, 100.0, 100.0))
            .child(NodeSnapshot::new("input", Rect::new(10.0, 10.0, 40.0, 20.0)).with_id("q"));
        let scene = Scene::from_snapshot(&SceneSnapshot {
            viewport: Viewport {
                width: 100.0,
                height: 100.0,
            },
            root,
        })
        .unwrap();
        let mark = Mark {
            index: 0,
            node: NodeId(1),
            rect: Rect::new(10.0, 10.0, 40.0, 20.0),
            color: Color::rgb(255, 0, 0),
            label_color: Color::WHITE,
            label: LabelPosition {
                top: 0.0,
                left: 10.0,
            },
            label_width: 15.0,
            label_height: 10.0,
            editable: true,
        };
        let dump = MarksDump::from_marks(&scene, &[mark], false);
        let value = serde_json::to_value(&dump).unwrap();
        let first = &value["marks"][0];
        assert_eq!(first["elementId"], "q");
        assert_eq!(first["tag"], "input");
        assert_eq!(first["box"]["width"], 40.0);
        assert_eq!(first["color"], "#ff0000");
        assert_eq!(first["labelColor"], "#ffffff");
        assert_eq!(first["node"], 1);
    }

    #[test]
    fn dump_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marks.json");
        let dump = MarksDump {
            viewport: Rect::new(0.0, 0.0, 10.0, 10.0),
            hidden: true,
            marks: Vec::new(),
        };
        write_marks_dump(&dump, Some(&path)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"hidden\": true"));
    }
}
