//! Python snippets sent through Web Remote Control.
//!
//! When the command socket is down, actor creation and saving fall back to
//! running a Python script inside the editor via the Python Script Plugin's
//! `ExecutePythonScript` remote function. Scripts are rendered from fixed
//! templates; every substituted value is escaped as a Python literal first,
//! so caller-supplied names and paths cannot break out of their string.

use serde_json::{json, Value};

/// Remote object exposing `ExecutePythonScript`.
pub const PYTHON_LIBRARY_OBJECT: &str = "/Script/PythonScriptPlugin.Default__PythonScriptLibrary";
pub const PYTHON_EXECUTE_FUNCTION: &str = "ExecutePythonScript";

/// Mesh assets shipped with the engine; actors created from these paths get
/// the mesh assigned after spawning.
pub const BASIC_SHAPES_PREFIX: &str = "/Engine/BasicShapes/";

const SPAWN_ACTOR_TEMPLATE: &str = r#"
import unreal

try:
    location = unreal.Vector({{x}}, {{y}}, {{z}})
    actor = unreal.EditorLevelLibrary.spawn_actor_from_class(
        unreal.StaticMeshActor,
        location=location
    )

    if actor:
{{mesh}}        actor.set_actor_label({{label}})
        print(f"SUCCESS: Created actor {actor.get_name()} at {location}")
    else:
        print("ERROR: Failed to create actor")

except Exception as e:
    print(f"ERROR: {str(e)}")
"#;

const ASSIGN_MESH_TEMPLATE: &str = r#"        mesh = unreal.EditorAssetLibrary.load_asset({{path}})
        if mesh:
            actor.static_mesh_component.set_static_mesh(mesh)
        else:
            print("ERROR: Could not load mesh " + {{path}})
"#;

const SAVE_ALL_SCRIPT: &str = r#"
import unreal
try:
    unreal.EditorAssetLibrary.save_directory('/Game/')
    print("SUCCESS: Project saved")
except Exception as e:
    print(f"ERROR: {str(e)}")
"#;

/// World-space position, in engine units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Script that spawns a static mesh actor at `location`, assigns the mesh
/// when `blueprint_path` is one of the engine's basic shapes, and labels it.
pub fn spawn_actor_script(location: Vector3, blueprint_path: &str, label: &str) -> String {
    let mesh = if blueprint_path.starts_with(BASIC_SHAPES_PREFIX) {
        render(ASSIGN_MESH_TEMPLATE, &[("path", py_str(blueprint_path))])
    } else {
        String::new()
    };
    render(
        SPAWN_ACTOR_TEMPLATE,
        &[
            ("x", py_float(location.x)),
            ("y", py_float(location.y)),
            ("z", py_float(location.z)),
            ("mesh", mesh),
            ("label", py_str(label)),
        ],
    )
}

/// Script that saves every asset under `/Game/`.
pub fn save_all_script() -> String {
    SAVE_ALL_SCRIPT.to_string()
}

/// Body for `PUT /remote/object/call` that runs `script` in the editor.
pub fn python_call_payload(script: String) -> Value {
    json!({
        "objectPath": PYTHON_LIBRARY_OBJECT,
        "functionName": PYTHON_EXECUTE_FUNCTION,
        "parameters": {
            "PythonScript": script
        }
    })
}

/// Replace `{{key}}` placeholders in a single pass. Substituted text is never
/// rescanned; unknown keys are left as they are.
fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let key = &after[..end];
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// Single-quoted Python string literal.
fn py_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Python float literal. Non-finite values cannot be spelled in Python
/// source and become `0.0`.
fn py_float(value: f64) -> String {
    if value.is_finite() {
        format!("{value:?}")
    } else {
        "0.0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_script_assigns_mesh_and_location() {
        let script = spawn_actor_script(
            Vector3 {
                x: 100.0,
                y: -50.5,
                z: 0.0,
            },
            "/Engine/BasicShapes/Cube",
            "CubeActor_1",
        );
        assert!(script.contains("unreal.Vector(100.0, -50.5, 0.0)"));
        assert!(script.contains("load_asset('/Engine/BasicShapes/Cube')"));
        assert!(script.contains("set_actor_label('CubeActor_1')"));
        assert!(!script.contains("{{"));
    }

    #[test]
    fn non_shape_path_skips_mesh() {
        let script = spawn_actor_script(Vector3::default(), "PointLight", "L");
        assert!(!script.contains("load_asset"));
        assert!(script.contains("set_actor_label('L')"));
    }

    #[test]
    fn label_is_escaped() {
        let script = spawn_actor_script(Vector3::default(), "X", "a'b\\c\nd");
        assert!(script.contains(r"set_actor_label('a\'b\\c\nd')"));
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = render("{{a}}-{{b}}", &[("a", "{{b}}".into()), ("b", "B".into())]);
        assert_eq!(out, "{{b}}-B");
    }

    #[test]
    fn unknown_and_unterminated_placeholders_pass_through() {
        assert_eq!(render("{{nope}} {{x", &[]), "{{nope}} {{x");
    }

    #[test]
    fn non_finite_coordinates_become_zero() {
        assert_eq!(py_float(f64::NAN), "0.0");
        assert_eq!(py_float(2.0), "2.0");
    }

    #[test]
    fn control_characters_are_escaped() {
        assert_eq!(py_str("\u{1}"), r"'\u0001'");
    }

    #[test]
    fn payload_targets_python_library() {
        let payload = python_call_payload(save_all_script());
        assert_eq!(payload["objectPath"], PYTHON_LIBRARY_OBJECT);
        assert_eq!(payload["functionName"], "ExecutePythonScript");
        assert!(payload["parameters"]["PythonScript"]
            .as_str()
            .unwrap()
            .contains("save_directory('/Game/')"));
    }
}
