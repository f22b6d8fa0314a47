use std::{fs, path::PathBuf, process::Command};

const MAP: &str = r#"
width = 3
height = 1
max_ticks = 20

[hazards]
spread_probability = 0.0
aftershock_probability = 0.0

[[hospitals]]
id = 1
cell = [0, 0]
capacity = 1
service_rate = 1

[[agents]]
id = 1
kind = "medic"
cell = [1, 0]

[[survivors]]
id = 2
cell = [1, 0]
deadline = 10
"#;

const SCRIPT: &str = r#"[
    [{"agent_id": 1, "action": "rescue", "target": 2}],
    [{"agent_id": 1, "action": "deliver", "target": 1}]
]"#;

fn fixture(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("crisis-response-cli-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create fixture directory");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn scripted_run_prints_a_json_summary() {
    let map = fixture("map.toml", MAP);
    let script = fixture("script.json", SCRIPT);

    let output = Command::new(env!("CARGO_BIN_EXE_crisis-response"))
        .arg("--map")
        .arg(&map)
        .arg("--script")
        .arg(&script)
        .output()
        .expect("run crisis-response");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary is json");
    assert_eq!(summary["ticks"], 2);
    assert_eq!(summary["totals"]["rescued"], 1);
    assert_eq!(summary["success_rate"], 100.0);
    assert_eq!(summary["avg_rescue_time"], 2.0);
    assert_eq!(
        summary["status"],
        serde_json::json!({ "Terminated": "AllSurvivorsResolved" })
    );
}

#[test]
fn invalid_maps_exit_with_an_error() {
    let map = fixture("broken.toml", "width = 0\nheight = 2\n");

    let output = Command::new(env!("CARGO_BIN_EXE_crisis-response"))
        .arg("--map")
        .arg(&map)
        .output()
        .expect("run crisis-response");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid map"));
}
