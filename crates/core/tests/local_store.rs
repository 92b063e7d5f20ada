//! End-to-end runs against a directory mirror of the bucket.

use std::path::Path;

use tempfile::TempDir;

use nwp_fetch_core::{
    load_config_from_str, validate_config, DownloadOrchestrator, FailureKind, PipelinePlan,
    RunParameters,
};

fn publish(mirror: &Path, keys: &[&str]) {
    for key in keys {
        let path = mirror.join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("GRIB {}", key)).unwrap();
    }
}

fn config_toml(mirror: &Path, download_dir: &Path) -> String {
    format!(
        r#"
[store]
backend = "local"
root = "{}"

[download]
dir = "{}"
timesteps = [3, 6]
max_concurrent = 2

[retry.run]
max_attempts = 1

[retry.timestep]
max_attempts = 1
"#,
        mirror.display(),
        download_dir.display()
    )
}

#[tokio::test]
async fn test_pipeline_against_local_mirror() {
    let mirror = TempDir::new().unwrap();
    let download_dir = TempDir::new().unwrap();
    publish(
        mirror.path(),
        &[
            "gfs.20201215/00/gfs.t00z.pgrb2.0p25.f000",
            "gfs.20201215/00/gfs.t00z.pgrb2.0p25.f003",
            "gfs.20201215/00/gfs.t00z.pgrb2.0p25.anl",
        ],
    );

    let config = load_config_from_str(&config_toml(mirror.path(), download_dir.path())).unwrap();
    validate_config(&config).unwrap();

    let orchestrator = DownloadOrchestrator::from_config(&config).await.unwrap();
    let plan = PipelinePlan::build(&config, RunParameters::new(0).with_date("20201215")).unwrap();
    let result = orchestrator.run(&plan).await.unwrap();

    assert_eq!(result.succeeded(), vec![3]);
    assert_eq!(
        result.status(6).unwrap().failure().unwrap().kind,
        FailureKind::Exhausted
    );

    let downloaded = download_dir
        .path()
        .join("gfs.20201215/00/gfs.t00z.pgrb2.0p25.f003");
    assert_eq!(
        std::fs::read_to_string(downloaded).unwrap(),
        "GRIB gfs.20201215/00/gfs.t00z.pgrb2.0p25.f003"
    );
    // Only requested timesteps are fetched.
    assert!(!download_dir
        .path()
        .join("gfs.20201215/00/gfs.t00z.pgrb2.0p25.f000")
        .exists());
}

#[tokio::test]
async fn test_missing_run_fails_the_invocation() {
    let mirror = TempDir::new().unwrap();
    let download_dir = TempDir::new().unwrap();
    publish(mirror.path(), &["gfs.20201214/18/gfs.t18z.pgrb2.0p25.f003"]);

    let config = load_config_from_str(&config_toml(mirror.path(), download_dir.path())).unwrap();
    let orchestrator = DownloadOrchestrator::from_config(&config).await.unwrap();
    let plan = PipelinePlan::build(&config, RunParameters::new(0).with_date("20201215")).unwrap();

    let err = orchestrator.run(&plan).await.unwrap_err();
    assert!(err.gave_up());
    assert_eq!(std::fs::read_dir(download_dir.path()).unwrap().count(), 0);
}
