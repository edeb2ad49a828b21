#![cfg(unix)]

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const EQUIPO: &str = "Nombre del procesador:,Test CPU\n\
                      Tamaño de memoria total:,16 GB\n\
                      Número de núcleos de procesador:,4\n\
                      Número de procesadores lógicos:,8\n";

const TELEMETRY: &str = "Fecha,Hora,Relojes núcleo (avg) [MHz]\n\
                         1.1.2024,10:00:00,\"3100,5\"\n\
                         1.1.2024,10:00:01,3200\n";

const CONTROL: &str = "C:/old/path/\nline2\nline3\nline4\nline5\nFe/old.txt\nline7\n";

fn topolco(cells: u64) -> String {
    format!("TOPOLCO\nh1\nh2\nh3\nh4\nh5\ncells {} 0\n", cells)
}

/// A temporary benchmark tree: models root, executables, results dir,
/// telemetry and equipment files, plus a config pointing at all of them.
struct Bench {
    tmp: TempDir,
}

impl Bench {
    fn new() -> Bench {
        let tmp = TempDir::new().unwrap();
        for dir in ["Modelos", "bin", "Res", "Monitor"] {
            fs::create_dir_all(tmp.path().join(dir)).unwrap();
        }
        fs::write(tmp.path().join("Monitor/equipo.csv"), EQUIPO).unwrap();
        fs::write(tmp.path().join("Monitor/monitoreo.csv"), TELEMETRY).unwrap();

        let bench = Bench { tmp };
        for exe in ["Toparc.exe", "Hantec.exe", "Control.exe", "Tetis.exe"] {
            bench.executable(exe, "exit 0");
        }
        bench.write_config("");
        bench
    }

    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn config_path(&self) -> PathBuf {
        self.root().join("config.toml")
    }

    fn write_config(&self, extra: &str) {
        let root = self.root().display();
        let text = format!(
            "equipment = \"TESTPC\"\n\
             models_dir = \"{root}/Modelos\"\n\
             executables_dir = \"{root}/bin\"\n\
             output_dir = \"{root}/Res\"\n\
             telemetry_file = \"{root}/Monitor/monitoreo.csv\"\n\
             equipment_file = \"{root}/Monitor/equipo.csv\"\n\
             poll_interval_ms = 50\n{extra}"
        );
        fs::write(self.config_path(), text).unwrap();
    }

    fn executable(&self, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root().join("bin").join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Leave the file in place but drop its execute bit, so launching fails.
    fn not_executable(&self, name: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root().join("bin").join(name);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    fn model(&self, name: &str, cells: u64, events: &[&str]) -> PathBuf {
        let dir = self.root().join("Modelos").join(name);
        fs::create_dir_all(dir.join("Fe")).unwrap();
        fs::write(dir.join("FileSSP.tet"), CONTROL).unwrap();
        fs::write(dir.join("Topolco.sds"), topolco(cells)).unwrap();
        for event in events {
            fs::write(dir.join("Fe").join(format!("{}.txt", event)), "event").unwrap();
        }
        dir
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("hydrobench").unwrap();
        cmd.arg("--config").arg(self.config_path());
        cmd.env("NO_COLOR", "1");
        cmd.env("RUST_LOG", "warn");
        cmd
    }

    fn report(&self, name: &str) -> (csv::StringRecord, Vec<csv::StringRecord>) {
        let mut reader = csv::Reader::from_path(self.root().join("Res").join(name)).unwrap();
        let header = reader.headers().unwrap().clone();
        let rows = reader.records().map(|r| r.unwrap()).collect();
        (header, rows)
    }
}

// ---- Event benchmark ----

#[test]
fn tetis_writes_one_row_per_event() {
    let bench = Bench::new();
    bench.executable("Tetis.exe", "sleep 0.3\nprintf 'results' > Fichero_resultados.res");
    bench.model("Fe_RioX_1k_BASE", 8532, &["Fe_2020", "Fe_2021"]);
    bench.model("Fe_RioY_30m_ALT", 120, &[]);
    bench.model("Fe_RioZ_5k_dry", 77, &["Fe_1999"]);

    bench
        .cmd()
        .arg("tetis")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 rows written to"))
        .stdout(predicate::str::contains("Execution total time was 0 hours and"));

    let (header, rows) = bench.report("Results_tetis_TESTPC.csv");
    assert_eq!(header.len(), 22);
    assert_eq!(rows.len(), 3);

    assert_eq!(&rows[0][0], "TESTPC");
    assert_eq!(&rows[0][1], "RIOX");
    assert_eq!(&rows[0][2], "1000");
    assert_eq!(&rows[0][3], "BASE");
    assert_eq!(&rows[0][4], "RioX_1k_BASE");
    assert_eq!(&rows[0][5], "8532");
    assert_eq!(&rows[0][6], "Fe_2020");
    assert_eq!(&rows[1][6], "Fe_2021");
    assert!(rows[0][7].parse::<f64>().unwrap() > 0.0);
    // Tetis outlives several polls, and the telemetry file's last reading is 3200 MHz.
    assert!(rows.iter().all(|row| &row[15] == "3.2" || &row[15] == "NaN"));
    assert!(rows.iter().any(|row| &row[15] == "3.2"));
    assert_eq!(&rows[0][18], "Test CPU");

    assert_eq!(&rows[2][2], "5000");
    assert_eq!(&rows[2][3], "DRY");
}

#[test]
fn tetis_two_models_one_event_each() {
    let bench = Bench::new();
    bench.model("Fe_RioX_1k_BASE", 100, &["Fe_1"]);
    bench.model("Fe_RioY_30m_ALT", 200, &["Fe_1"]);

    bench.cmd().arg("tetis").assert().success();

    let (_, rows) = bench.report("Results_tetis_TESTPC.csv");
    assert_eq!(rows.len(), 2);
    assert_eq!((&rows[0][1], &rows[0][2], &rows[0][3]), ("RIOX", "1000", "BASE"));
    assert_eq!((&rows[1][1], &rows[1][2], &rows[1][3]), ("RIOY", "30", "ALT"));
    assert_eq!(&rows[1][5], "200");
}

#[test]
fn tetis_with_relative_models_dir() {
    let bench = Bench::new();
    bench.executable("Tetis.exe", "printf 'results' > Fichero_resultados.res");
    bench.model("Fe_RioX_1k_BASE", 10, &["Fe_1"]);
    let config = fs::read_to_string(bench.config_path()).unwrap();
    let absolute = format!("models_dir = \"{}/Modelos\"", bench.root().display());
    fs::write(
        bench.config_path(),
        config.replace(&absolute, "models_dir = \"Modelos\""),
    )
    .unwrap();

    bench
        .cmd()
        .current_dir(bench.root())
        .arg("tetis")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 row written to"))
        .stdout(predicate::str::contains("not executable").not());

    let (_, rows) = bench.report("Results_tetis_TESTPC.csv");
    assert_eq!(rows.len(), 1);
    assert_ne!(&rows[0][7], "NOT EXECUTABLE");
    assert!(rows[0][16].parse::<f64>().unwrap() > 0.0);
}

#[test]
fn tetis_patches_control_file_for_last_event() {
    let bench = Bench::new();
    let model = bench.model("Fe_RioX_1k_BASE", 10, &["Fe_a", "Fe_b"]);

    bench.cmd().arg("tetis").assert().success();

    let original = fs::read_to_string(model.join("FileSSP.tet")).unwrap();
    let copy = fs::read_to_string(model.join("FileSSP.txt")).unwrap();
    assert_eq!(original, copy);

    let lines: Vec<&str> = original.lines().collect();
    assert!(lines[0].ends_with("Fe_RioX_1k_BASE/"));
    assert_eq!(lines[1], "line2");
    assert_eq!(lines[5], "Fe/Fe_b.txt");
    assert_eq!(lines[6], "line7");
}

#[test]
fn tetis_failure_is_recorded_as_not_executable() {
    let bench = Bench::new();
    bench.not_executable("Tetis.exe");
    bench.model("Fe_RioX_1k_BASE", 10, &["Fe_1"]);

    bench
        .cmd()
        .arg("tetis")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 run not executable"));

    let (_, rows) = bench.report("Results_tetis_TESTPC.csv");
    assert_eq!(rows.len(), 1);
    for i in 7..18 {
        assert_eq!(&rows[0][i], "NOT EXECUTABLE", "column {i}");
    }
}

#[test]
fn tetis_timeout_is_recorded_as_not_executable() {
    let bench = Bench::new();
    bench.executable("Tetis.exe", "exec sleep 30");
    bench.write_config("timeout_secs = 1\n");
    bench.model("Fe_RioX_1k_BASE", 10, &["Fe_1"]);

    bench.cmd().arg("tetis").assert().success();

    let (_, rows) = bench.report("Results_tetis_TESTPC.csv");
    assert_eq!(&rows[0][7], "NOT EXECUTABLE");
}

#[test]
fn control_failure_aborts_batch() {
    let bench = Bench::new();
    bench.executable("Control.exe", "exit 3");
    bench.model("Fe_RioX_1k_BASE", 10, &["Fe_1"]);
    let previous = bench.root().join("Res/Results_tetis_TESTPC.csv");
    fs::write(&previous, "Equipo\nOLDPC\n").unwrap();

    bench
        .cmd()
        .arg("tetis")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Control.exe failed in"));

    assert_eq!(fs::read_to_string(&previous).unwrap(), "Equipo\nOLDPC\n");
}

#[test]
fn models_dir_missing_is_error() {
    let bench = Bench::new();
    fs::remove_dir_all(bench.root().join("Modelos")).unwrap();

    bench
        .cmd()
        .arg("tetis")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Models directory not found"));
}

// ---- Topology phase ----

#[test]
fn topology_times_both_executables() {
    let bench = Bench::new();
    bench.executable(
        "Toparc.exe",
        "printf 'TOPOLCO\\na\\nb\\nc\\nd\\ne\\ncells 4242 0\\n' > Topolco.sds",
    );
    bench.executable("Hantec.exe", "head -c 2048 /dev/zero > Hantec.sds");
    let model = bench.model("Fe_RioX_1k_BASE", 1, &[]);

    bench
        .cmd()
        .arg("topology")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 row written to"));

    let (header, rows) = bench.report("Results_toparc_hantec_TESTPC.csv");
    assert_eq!(header.len(), 32);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][5], "4242");
    assert!(rows[0][26].parse::<f64>().unwrap() > 0.0);

    let control = fs::read_to_string(model.join("FileSSP.tet")).unwrap();
    assert!(control.lines().next().unwrap().ends_with("Fe_RioX_1k_BASE/"));
    assert!(control.contains("Fe/old.txt"));
}

#[test]
fn topology_missing_hantec_is_not_executable() {
    let bench = Bench::new();
    bench.not_executable("Hantec.exe");
    bench.model("Fe_RioX_1k_BASE", 99, &[]);

    bench.cmd().arg("topology").assert().success();

    let (_, rows) = bench.report("Results_toparc_hantec_TESTPC.csv");
    assert_ne!(&rows[0][6], "NOT EXECUTABLE");
    assert_eq!(&rows[0][15], "NOT EXECUTABLE");
    assert_eq!(&rows[0][26], "NOT EXECUTABLE");
}

// ---- Calibration copy ----

#[test]
fn copy_calib_fills_every_model() {
    let bench = Bench::new();
    let a = bench.model("Fe_RioX_1k_BASE", 1, &[]);
    let b = bench.model("Fe_RioY_30m_ALT", 1, &[]);
    let calib = bench.root().join("calib");
    fs::create_dir(&calib).unwrap();
    fs::write(calib.join("Calib.txt"), "c").unwrap();
    fs::write(calib.join("FactorETmes.txt"), "f").unwrap();

    bench
        .cmd()
        .args(["copy-calib", "--from"])
        .arg(&calib)
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied 4 files into 2 models"));

    for model in [a, b] {
        assert_eq!(fs::read_to_string(model.join("Calib.txt")).unwrap(), "c");
        assert_eq!(fs::read_to_string(model.join("FactorETmes.txt")).unwrap(), "f");
    }
}

// ---- Listing ----

#[test]
fn list_default_format() {
    let bench = Bench::new();
    bench.model("Fe_RioX_1k_BASE", 8532, &["Fe_1", "Fe_2"]);

    bench
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fe_RioX_1k_BASE"))
        .stdout(predicate::str::contains("RIOX / 1000 m / BASE"))
        .stdout(predicate::str::contains("2 runs queued. Run: hydrobench tetis"));
}

#[test]
fn list_json_is_valid() {
    let bench = Bench::new();
    bench.model("Fe_RioX_1k_BASE", 8532, &["Fe_1"]);
    bench.model("Fe_RioY_30m_ALT", 12, &[]);

    let output = bench.cmd().args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let arr = parsed.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["dir_name"], "Fe_RioX_1k_BASE");
    assert_eq!(arr[0]["cells"], 8532);
    assert_eq!(arr[0]["events"][0]["relative_path"], "Fe/Fe_1.txt");
    assert_eq!(arr[1]["name"]["scale"], "30");
}

#[test]
fn list_short_format() {
    let bench = Bench::new();
    bench.model("Fe_RioX_1k_BASE", 1, &["Fe_1"]);

    bench
        .cmd()
        .args(["list", "--format", "short"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fe_RioX_1k_BASE  1 event"))
        .stdout(predicate::str::contains("Models under").not());
}

// ---- Config ----

#[test]
fn missing_config_file_is_error() {
    let tmp = TempDir::new().unwrap();
    Command::cargo_bin("hydrobench")
        .unwrap()
        .arg("--config")
        .arg(tmp.path().join("nope.toml"))
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn invalid_config_is_error() {
    let bench = Bench::new();
    fs::write(bench.config_path(), "equipment = 3\n").unwrap();

    bench
        .cmd()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.toml"));
}

#[test]
fn no_subcommand_shows_usage() {
    Command::cargo_bin("hydrobench")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
