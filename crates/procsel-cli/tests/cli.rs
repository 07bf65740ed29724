use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.json"), "{}").unwrap();
        fs::create_dir_all(dir.path().join("root")).unwrap();
        Self { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("root")
    }

    fn touch(&self, relative: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("procsel").unwrap();
        cmd.arg("-c").arg(self.config());
        cmd
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn resolve_prints_selected_file() {
    let fx = Fixture::new();
    fx.touch("05_DGB/02_standard.prc");

    fx.cmd()
        .args(["resolve", "-f", "Feature-Typ=Bohrung", "-f", "Durchmesser=12,0"])
        .args(["-r", path_arg(&fx.root())])
        .assert()
        .success()
        .stdout(predicate::str::contains("02_standard.prc"));
}

#[test]
fn resolve_from_json_file_as_json() {
    let fx = Fixture::new();
    fx.touch("05_DGB/02_standard.prc");
    let input = fx.write(
        "fields.json",
        r#"{"Feature-Typ": "Bohrung", "Durchmesser": "9,500000", "Tiefe": null}"#,
    );

    fx.cmd()
        .args(["resolve", path_arg(&input), "--format", "json"])
        .args(["-r", path_arg(&fx.root())])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status": "resolved""#))
        .stdout(predicate::str::contains(r#""prefix": "02""#));
}

#[test]
fn resolve_without_match_exits_with_two() {
    let fx = Fixture::new();
    fx.touch("05_DGB/01_x.prc");

    fx.cmd()
        .args(["resolve", "-f", "Feature-Typ=Bohrung", "-f", "Durchmesser=9,500000"])
        .args(["-r", path_arg(&fx.root())])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No process file found"));
}

#[test]
fn resolve_explain_lists_steps() {
    let fx = Fixture::new();
    fx.touch("05_DGB/02_standard.prc");

    fx.cmd()
        .args(["resolve", "-f", "Feature-Typ=Bohrung", "-f", "Durchmesser=12", "--explain"])
        .args(["-r", path_arg(&fx.root())])
        .assert()
        .success()
        .stderr(predicate::str::contains("#67"));
}

#[test]
fn resolve_without_root_fails() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["resolve", "-f", "Feature-Typ=Bohrung"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("default_root"));
}

#[test]
fn resolve_rejects_unknown_field() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["resolve", "-f", "Farbe=rot", "-r", path_arg(&fx.root())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field name"));
}

#[test]
fn rules_validate_builtin() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["rules", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("esprit-default"))
        .stdout(predicate::str::contains("passung fräsen"));
}

#[test]
fn rules_validate_rejects_shadowed_keyword() {
    let fx = Fixture::new();
    let rules = fx.write(
        "rules.json",
        r#"{
            "name": "shadowed",
            "ordering": "declaration",
            "rules": [
                {"keywords": ["nuten"], "action": {"static": {"subdir": "07_NUTEN", "prefix": "01"}}},
                {"keywords": ["nuten rückzug"], "action": {"static": {"subdir": "07_NUTEN", "prefix": "02"}}}
            ]
        }"#,
    );

    fx.cmd()
        .args(["rules", "validate", "--rules", path_arg(&rules)])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("shadows"));
}

#[test]
fn rules_show_lists_rules() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["rules", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tasche profit radius"));
}

#[test]
fn parse_panel_text() {
    let fx = Fixture::new();
    let text = fx.write("panel.txt", "Feature-Typ: Bohrung\nDurchmesser: 12,0\n");

    fx.cmd()
        .args(["parse", path_arg(&text)])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""Feature-Typ": "Bohrung""#));
}

#[test]
fn batch_writes_summary() {
    let fx = Fixture::new();
    fx.touch("05_DGB/02_standard.prc");
    let inputs = fx.dir.path().join("inputs");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(
        inputs.join("a.json"),
        r#"{"Feature-Typ": "Bohrung", "Durchmesser": "12"}"#,
    )
    .unwrap();
    fs::write(inputs.join("b.json"), r#"{"Feature-Typ": "Tasche"}"#).unwrap();
    let out = fx.dir.path().join("out");
    let pattern = format!("{}/*.json", inputs.display());

    fx.cmd()
        .args(["batch", &pattern, "--summary", "-j", "2"])
        .args(["-r", path_arg(&fx.root())])
        .args(["-o", path_arg(&out)])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 resolved"));

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.starts_with("filename,status"));
    assert!(summary.contains("a.json,resolved,bohrung,67"));
    assert!(summary.contains("b.json,no_match,tasche"));
    assert!(out.join("a.json.resolution.json").exists());
}

#[test]
fn batch_keeps_reports_of_same_stem_apart() {
    let fx = Fixture::new();
    fx.touch("05_DGB/02_standard.prc");
    let inputs = fx.dir.path().join("inputs");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(
        inputs.join("a.json"),
        r#"{"Feature-Typ": "Bohrung", "Durchmesser": "12"}"#,
    )
    .unwrap();
    fs::write(inputs.join("a.txt"), "Feature-Typ: Tasche\n").unwrap();
    let out = fx.dir.path().join("out");
    let pattern = format!("{}/a.*", inputs.display());

    fx.cmd()
        .args(["batch", &pattern])
        .args(["-r", path_arg(&fx.root())])
        .args(["-o", path_arg(&out)])
        .assert()
        .success();

    let json_report = fs::read_to_string(out.join("a.json.resolution.json")).unwrap();
    let text_report = fs::read_to_string(out.join("a.txt.resolution.json")).unwrap();
    assert!(json_report.contains(r#""status": "resolved""#));
    assert!(text_report.contains(r#""status": "no_match""#));
}

#[test]
fn config_init_and_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.json");

    Command::cargo_bin("procsel")
        .unwrap()
        .args(["-c", path_arg(&config), "config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    Command::cargo_bin("procsel")
        .unwrap()
        .args(["-c", path_arg(&config), "config", "set", "roots.default_root", "1.2379"])
        .assert()
        .success();

    Command::cargo_bin("procsel")
        .unwrap()
        .args(["-c", path_arg(&config), "config", "get", "roots.default_root"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""1.2379""#));
}
