use std::fs;
use std::path::PathBuf;

use cnc_config::MachiningConfig;
use cnc_engine::job::Job;
use cnc_frontend::errors::FrontendError;
use cnc_frontend::{drill::drill, engrave::engrave, info::describe, process_files};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

fn run<F>(files: &[PathBuf], layers: &[String], operation: F) -> (String, usize)
where
    F: FnMut(&mut Vec<u8>, &Job) -> Result<(), FrontendError>,
{
    let mut out = Vec::new();
    let report = process_files(files, layers, &mut out, operation);
    (String::from_utf8(out).expect("utf8"), report.failed)
}

#[test]
fn drill_fixture_orders_holes_from_origin() {
    let config = MachiningConfig::default();
    let (output, failed) = run(&[fixture("plate.dxf")], &[], |out, job| {
        drill(out, job, &config)
    });

    assert_eq!(failed, 0);
    assert!(output.starts_with("; File: plate.dxf\nG90\nG21\nG0 Z5.0\n"));
    assert!(output.ends_with("G0X0Y0\n\n; End of file: plate.dxf\n\n"));
    let near = output.find("G0 X5.000 Y5.000").expect("near hole");
    let far = output.find("G0 X20.000 Y20.000").expect("far hole");
    assert!(near < far);
    assert_eq!(output.matches(";------ Point").count(), 2);
}

#[test]
fn engrave_fixture_links_both_lines() {
    let config = MachiningConfig::default();
    let (output, failed) = run(&[fixture("plate.dxf")], &[], |out, job| {
        engrave(out, job, &config)
    });

    assert_eq!(failed, 0);
    assert_eq!(output.matches("; Tool down").count(), 1);
    assert!(output.contains(
        ";------ Segment #2 / Layer CUT\nG1 X10.000 Y0.000 F60.000\n\
         ;------ Segment #3 / Layer CUT\nG1 X10.000 Y10.000 F60.000\n"
    ));
}

#[test]
fn layer_filter_is_applied_per_file() {
    let config = MachiningConfig::default();
    let layers = vec!["CUT".to_string()];
    let (output, _) = run(&[fixture("plate.dxf")], &layers, |out, job| {
        drill(out, job, &config)
    });
    assert!(!output.contains(";------ Point"));

    let (output, _) = run(&[fixture("plate.dxf")], &layers, |out, job| describe(out, job));
    assert!(output.contains("\t* CUT [default]\n\t\tLines: 2\n"));
    assert!(!output.contains("HOLES"));
}

#[test]
fn failing_file_does_not_stop_the_batch() {
    let config = MachiningConfig::default();
    let dir = tempfile::tempdir().expect("temp dir");
    let files = [
        fixture("broken.dxf"),
        dir.path().join("missing.dxf"),
        fixture("plate.dxf"),
    ];
    let mut out = Vec::new();
    let report = process_files(&files, &[], &mut out, |out, job| drill(out, job, &config));

    assert_eq!(report.failed, 2);
    assert_eq!(report.processed, 1);
    assert!(!report.is_success());
    let output = String::from_utf8(out).expect("utf8");
    assert!(!output.contains("broken.dxf"));
    assert_eq!(output.matches("; File: ").count(), 1);
}

#[test]
fn headers_use_the_file_name_only() {
    let dir = tempfile::tempdir().expect("temp dir");
    let copy = dir.path().join("nested").join("copy.dxf");
    fs::create_dir_all(copy.parent().expect("parent")).expect("create dir");
    fs::copy(fixture("plate.dxf"), &copy).expect("copy fixture");

    let config = MachiningConfig::default();
    let (output, failed) = run(&[copy], &[], |out, job| drill(out, job, &config));

    assert_eq!(failed, 0);
    assert!(output.starts_with("; File: copy.dxf\n"));
    assert!(output.contains("; End of file: copy.dxf\n"));
    assert!(!output.contains("nested"));
}
